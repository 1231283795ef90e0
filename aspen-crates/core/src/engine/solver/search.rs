//! The decide-propagate-analyse loop.
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;

use super::Solver;
use super::SolverState;
use crate::basic_types::Random;
use crate::engine::termination::TerminationCondition;
use crate::engine::variables::Literal;
use crate::engine::variables::Value;
use crate::heuristics::DecisionHeuristic;
use crate::heuristics::SelectRandom;

/// How a call to [`Solver::search`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// Every variable is assigned and no constraint is violated.
    Model,
    /// A conflict could not be resolved above the root level.
    Unsatisfiable,
    /// The conflict limit was reached; the solver backtracked to the backtrack level.
    Restart,
    /// The termination condition asked the solver to stop.
    Interrupted,
}

/// What the solver did to extend the assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Branch {
    /// A new decision level was opened.
    Decided,
    /// Failed-literal detection asserted a literal (or found a conflict) without deciding.
    Propagate,
    /// No free variable is left.
    Complete,
}

/// The fraction of the learnt clauses removed when the learnt database is full.
const REDUCE_FRACTION: f64 = 1.0 / 3.0;

impl Solver {
    /// Searches for a model until one is found, the problem is proven unsatisfiable (above the
    /// root level), more than `max_conflicts` conflicts occurred or `termination` fires.
    ///
    /// The learnt database is reduced whenever it holds more than `max_learnts` clauses. With
    /// probability `random_probability` a decision is made at random. With `local_restart` the
    /// conflict limit applies to the conflicts below the current decision level instead of to
    /// the whole call.
    pub fn search(
        &mut self,
        max_conflicts: u64,
        max_learnts: u64,
        random_probability: f64,
        local_restart: bool,
        termination: &mut impl TerminationCondition,
    ) -> SearchResult {
        self.init_random_heuristic(random_probability);
        let max_conflicts = max_conflicts.max(1);
        let mut conflicts_left = max_conflicts;

        loop {
            while !self.propagate() {
                termination.conflict_has_been_detected();
                if !self.resolve_conflict() || (self.decision_level() == 0 && !self.simplify()) {
                    if self.root_level == 0 {
                        self.state = SolverState::Infeasible;
                    }
                    return SearchResult::Unsatisfiable;
                }
                conflicts_left = conflicts_left.saturating_sub(1);
                let restart = if local_restart {
                    let opened_at = self.level_conflicts.last().copied().unwrap_or(0);
                    self.statistics.search.conflicts - opened_at > max_conflicts
                } else {
                    conflicts_left == 0
                };
                if restart {
                    self.undo_until(0);
                    self.statistics.search.restarts += 1;
                    return SearchResult::Restart;
                }
                if termination.should_stop() {
                    return SearchResult::Interrupted;
                }
            }

            if self.decision_level() == 0 && !self.simplify() {
                return SearchResult::Unsatisfiable;
            }
            if self.learnts.len() as u64 > max_learnts {
                self.reduce_learnts(REDUCE_FRACTION);
            }
            if termination.should_stop() {
                return SearchResult::Interrupted;
            }

            match self.decide_next_branch() {
                Branch::Complete => return SearchResult::Model,
                Branch::Decided => termination.decision_has_been_made(),
                Branch::Propagate => {}
            }
        }
    }

    /// Makes the next decision. Priority variables come first, then the literals of the minimize
    /// constraint if enabled, then (with the configured probability) a random variable, and
    /// otherwise the choice of the heuristic.
    fn decide_next_branch(&mut self) -> Branch {
        if self.probe_failed_literals() {
            return Branch::Propagate;
        }

        let forced = self.select_priority().or_else(|| self.select_minimize());
        let choice = forced.or_else(|| {
            self.select_random()
                .or_else(|| {
                    let mut heuristic = std::mem::take(&mut self.heuristic);
                    let choice = heuristic.select(self);
                    self.heuristic = heuristic;
                    choice
                })
                .map(|choice| self.saved_phase(choice))
        });
        let Some(choice) = choice else {
            return Branch::Complete;
        };
        self.assume(choice);
        Branch::Decided
    }

    /// The literal of the variable of `choice` which was true when it was last assigned, if
    /// progress saving is enabled.
    fn saved_phase(&self, choice: Literal) -> Literal {
        match self.assignments.saved_value(choice.var()) {
            Value::True if self.options.save_progress => Literal::positive(choice.var()),
            Value::False if self.options.save_progress => Literal::negative(choice.var()),
            _ => choice,
        }
    }

    /// Runs failed-literal detection if the heuristic asks for it.
    fn probe_failed_literals(&mut self) -> bool {
        let Some(mut state) = self.heuristic.take_lookahead_state() else {
            return false;
        };
        state.reset();
        let failed = self.failed_literal(&mut state);
        self.heuristic.restore_lookahead_state(state);
        failed
    }

    fn select_priority(&self) -> Option<Literal> {
        self.priority_vars
            .iter()
            .find(|&&var| self.assignments.is_free(var))
            .map(|&var| self.assignments.preferred_literal(var))
    }

    fn select_minimize(&self) -> Option<Literal> {
        if !self.minimize_decisions {
            return None;
        }
        self.minimize_constraint()?.select(&self.assignments)
    }

    fn select_random(&mut self) -> Option<Literal> {
        if self.random_probability <= 0.0
            || !self
                .options
                .random_generator
                .generate_bool(self.random_probability.min(1.0))
        {
            return None;
        }
        let mut random = self.random_heuristic.take()?;
        let choice = random.select(self);
        self.random_heuristic = Some(random);
        choice
    }

    /// Sets the probability of random decisions, creating the random heuristic on first use.
    fn init_random_heuristic(&mut self, random_probability: f64) {
        self.random_probability = random_probability;
        if random_probability <= 0.0 || self.random_heuristic.is_some() {
            return;
        }
        let seed: u64 = self.options.random_generator.gen();
        let mut random = SelectRandom::new(SmallRng::seed_from_u64(seed));
        random.end_init(self);
        self.random_heuristic = Some(random);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::ConflictBudget;
    use crate::engine::termination::DecisionBudget;
    use crate::engine::termination::Indefinite;
    use crate::engine::variables::Var;
    use crate::engine::variables::VarKind;
    use crate::engine::SolverOptions;

    fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    fn solver(options: SolverOptions, num_vars: u32, clauses: &[&[i32]]) -> Solver {
        let mut solver = Solver::new(options);
        for _ in 0..num_vars {
            let _ = solver.add_var(VarKind::Atom);
        }
        solver.start_add_constraints();
        for clause in clauses {
            solver
                .add_clause(clause.iter().map(|&id| lit(id)))
                .expect("no root conflict");
        }
        assert!(solver.end_add_constraints(false));
        solver
    }

    fn pigeon_hole(pigeons: i32) -> Vec<Vec<i32>> {
        let holes = pigeons - 1;
        let var = |pigeon: i32, hole: i32| pigeon * holes + hole + 1;
        let mut clauses = vec![];
        for pigeon in 0..pigeons {
            clauses.push((0..holes).map(|hole| var(pigeon, hole)).collect());
        }
        for hole in 0..holes {
            for first in 0..pigeons {
                for second in first + 1..pigeons {
                    clauses.push(vec![-var(first, hole), -var(second, hole)]);
                }
            }
        }
        clauses
    }

    fn pigeon_hole_solver(pigeons: i32, options: SolverOptions) -> Solver {
        let clauses = pigeon_hole(pigeons);
        let clauses: Vec<&[i32]> = clauses.iter().map(Vec::as_slice).collect();
        solver(options, (pigeons * (pigeons - 1)) as u32, &clauses)
    }

    #[test]
    fn exhausting_the_conflict_limit_restarts() {
        let mut solver = pigeon_hole_solver(5, SolverOptions::default());

        let result = solver.search(1, u64::MAX, 0.0, false, &mut Indefinite);
        assert_eq!(result, SearchResult::Restart);
        assert_eq!(solver.decision_level(), 0);
        assert_eq!(solver.statistics().search.restarts, 1);
        assert_eq!(solver.statistics().search.conflicts, 1);
    }

    #[test]
    fn restarts_keep_learnt_clauses_and_search_can_resume() {
        let mut solver = pigeon_hole_solver(4, SolverOptions::default());

        let mut result = SearchResult::Restart;
        while result == SearchResult::Restart {
            result = solver.search(10, u64::MAX, 0.0, false, &mut Indefinite);
        }
        assert_eq!(result, SearchResult::Unsatisfiable);
        assert!(solver.is_infeasible());
    }

    #[test]
    fn termination_interrupts_the_search() {
        let mut solver = pigeon_hole_solver(5, SolverOptions::default());

        let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut DecisionBudget::new(2));
        assert_eq!(result, SearchResult::Interrupted);
        assert!(solver.statistics().search.choices >= 2);

        let mut solver = pigeon_hole_solver(5, SolverOptions::default());
        let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut ConflictBudget::new(3));
        assert_eq!(result, SearchResult::Interrupted);
        assert_eq!(solver.statistics().search.conflicts, 3);
    }

    #[test]
    fn random_decisions_still_find_models() {
        let clauses: &[&[i32]] = &[&[1, 2, 3], &[-1, -2], &[-2, -3], &[-1, -3], &[4, 5]];
        let mut solver = solver(SolverOptions::with_seed(7), 5, clauses);

        let result = solver.search(u64::MAX, u64::MAX, 1.0, false, &mut Indefinite);
        assert_eq!(result, SearchResult::Model);
        assert!(clauses
            .iter()
            .all(|clause| clause.iter().any(|&id| solver.is_true(lit(id)))));
    }

    #[test]
    fn priority_variables_are_decided_first() {
        let mut solver = solver(SolverOptions::default(), 3, &[&[1, 2, 3]]);
        solver.set_priority_vars(vec![Var::new(3)]);

        let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite);
        assert_eq!(result, SearchResult::Model);
        assert_eq!(solver.assignments().decision(1), lit(-3));
    }

    #[test]
    fn saved_phases_are_reused() {
        let options = SolverOptions {
            save_progress: true,
            ..SolverOptions::default()
        };
        let mut solver = solver(options, 2, &[&[1, 2]]);

        solver.assume(lit(1));
        solver.assume(lit(2));
        assert!(solver.propagate());
        // Only levels below the first undone one save their phase.
        solver.undo_until(0);

        let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite);
        assert_eq!(result, SearchResult::Model);
        assert!(solver.is_true(lit(1)));
    }
}
