use crate::create_statistics_struct;
use crate::engine::constraints::ConstraintKind;
use crate::statistics::log_statistic;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

/// The counters of the search; reset for every incremental step.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolverStatistics {
    pub search: SearchStatistics,
    pub constraints: ConstraintStatistics,
    /// Only collected when jump statistics are enabled.
    pub jumps: Option<JumpStatistics>,
}

create_statistics_struct!(
    /// Counters of the search loop.
    SearchStatistics {
        models: u64,
        conflicts: u64,
        /// Learnt loop nogoods.
        loops: u64,
        choices: u64,
        restarts: u64,
        /// Literals in learnt conflict clauses.
        conflict_literals: u64,
        /// Literals in learnt loop nogoods.
        loop_literals: u64,
        /// Decision literals of the reported models.
        model_decisions: u64,
});

create_statistics_struct!(
    /// Counters of the constraint database.
    ConstraintStatistics {
        natives: u64,
        native_binary: u64,
        native_ternary: u64,
        learnts: u64,
        learnt_binary: u64,
        learnt_ternary: u64,
        deleted: u64,
});

create_statistics_struct!(
    /// How far the solver jumped back after conflicts.
    JumpStatistics {
        jumps: u64,
        /// Jumps which were limited by the backtrack level.
        bounded_jumps: u64,
        jump_sum: u64,
        /// Levels which could not be skipped because of the backtrack level.
        bound_sum: u64,
        max_jump: u32,
        max_executed_jump: u32,
        max_bound: u32,
});

impl SolverStatistics {
    pub fn with_jump_statistics() -> SolverStatistics {
        SolverStatistics {
            jumps: Some(JumpStatistics::default()),
            ..SolverStatistics::default()
        }
    }

    /// Clears every counter, keeping whether jumps are tracked.
    pub fn reset(&mut self) {
        let track_jumps = self.jumps.is_some();
        *self = SolverStatistics::default();
        if track_jumps {
            self.jumps = Some(JumpStatistics::default());
        }
    }

    /// Adds the counters of another step to these.
    pub fn accumulate(&mut self, other: &SolverStatistics) {
        let search = &mut self.search;
        search.models += other.search.models;
        search.conflicts += other.search.conflicts;
        search.loops += other.search.loops;
        search.choices += other.search.choices;
        search.restarts += other.search.restarts;
        search.conflict_literals += other.search.conflict_literals;
        search.loop_literals += other.search.loop_literals;
        search.model_decisions += other.search.model_decisions;

        let constraints = &mut self.constraints;
        constraints.natives = other.constraints.natives;
        constraints.native_binary = other.constraints.native_binary;
        constraints.native_ternary = other.constraints.native_ternary;
        constraints.learnts += other.constraints.learnts;
        constraints.learnt_binary += other.constraints.learnt_binary;
        constraints.learnt_ternary += other.constraints.learnt_ternary;
        constraints.deleted += other.constraints.deleted;

        if let (Some(jumps), Some(other)) = (self.jumps.as_mut(), other.jumps.as_ref()) {
            jumps.jumps += other.jumps;
            jumps.bounded_jumps += other.bounded_jumps;
            jumps.jump_sum += other.jump_sum;
            jumps.bound_sum += other.bound_sum;
            jumps.max_jump = jumps.max_jump.max(other.max_jump);
            jumps.max_executed_jump = jumps.max_executed_jump.max(other.max_executed_jump);
            jumps.max_bound = jumps.max_bound.max(other.max_bound);
        }
    }

    pub(crate) fn add_learnt(&mut self, size: usize, kind: ConstraintKind) {
        match kind {
            ConstraintKind::Static => {}
            ConstraintKind::Conflict => self.search.conflict_literals += size as u64,
            ConstraintKind::Loop => {
                self.search.loops += 1;
                self.search.loop_literals += size as u64;
            }
        }
        self.constraints.learnts += 1;
        match size {
            2 => self.constraints.learnt_binary += 1,
            3 => self.constraints.learnt_ternary += 1,
            _ => {}
        }
    }

    /// Records a backjump from `decision_level` to `uip_level`, which was limited to
    /// `backtrack_level`.
    pub(crate) fn update_jumps(&mut self, decision_level: u32, uip_level: u32, backtrack_level: u32) {
        let Some(jumps) = self.jumps.as_mut() else {
            return;
        };
        let jump = decision_level - uip_level;
        jumps.jumps += 1;
        jumps.jump_sum += u64::from(jump);
        jumps.max_jump = jumps.max_jump.max(jump);
        if uip_level < backtrack_level {
            let bound = backtrack_level - uip_level;
            jumps.bounded_jumps += 1;
            jumps.bound_sum += u64::from(bound);
            jumps.max_bound = jumps.max_bound.max(bound);
            jumps.max_executed_jump = jumps.max_executed_jump.max(jump - bound);
        } else {
            jumps.max_executed_jump = jumps.max_executed_jump.max(jump);
        }
    }

    pub fn log(&self, verbose: bool) {
        log_statistic("models", self.search.models);
        log_statistic("conflicts", self.search.conflicts);
        log_statistic("choices", self.search.choices);
        log_statistic("restarts", self.search.restarts);
        if verbose {
            self.search.log(StatisticLogger::new("search"));
            self.constraints.log(StatisticLogger::new("constraints"));
            if let Some(jumps) = &self.jumps {
                jumps.log(StatisticLogger::new("jumps"));
                if jumps.jumps > 0 {
                    log_statistic(
                        "averageJump",
                        jumps.jump_sum as f64 / jumps.jumps as f64,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_jumps_are_recorded_separately() {
        let mut statistics = SolverStatistics::with_jump_statistics();
        statistics.update_jumps(10, 2, 5);
        statistics.update_jumps(6, 5, 0);

        let jumps = statistics.jumps.unwrap();
        assert_eq!(jumps.jumps, 2);
        assert_eq!(jumps.jump_sum, 9);
        assert_eq!(jumps.bounded_jumps, 1);
        assert_eq!(jumps.bound_sum, 3);
        assert_eq!(jumps.max_jump, 8);
        assert_eq!(jumps.max_executed_jump, 5);
    }

    #[test]
    fn accumulate_adds_counters_and_keeps_maxima() {
        let mut first = SolverStatistics::with_jump_statistics();
        first.search.conflicts = 3;
        first.update_jumps(4, 1, 0);
        let mut second = SolverStatistics::with_jump_statistics();
        second.search.conflicts = 2;
        second.update_jumps(9, 8, 0);

        first.accumulate(&second);
        assert_eq!(first.search.conflicts, 5);
        assert_eq!(first.jumps.unwrap().max_jump, 3);

        first.reset();
        assert_eq!(first.search.conflicts, 0);
        assert!(first.jumps.is_some());
    }
}
