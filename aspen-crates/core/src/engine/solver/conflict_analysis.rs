//! Resolution of conflicts: first-UIP learning, clause minimisation and bounded backjumping.
use enumset::EnumSet;

use super::constraint_creation::ClauseStore;
use super::MinimizationStrategy;
use super::Solver;
use crate::aspen_assert_moderate;
use crate::engine::constraints::ConstraintKind;
use crate::engine::reason::AntecedentKind;
use crate::engine::reason::Reason;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::heuristics::DecisionHeuristic;

/// Maps a decision level onto one of 32 bits; used to cut off the redundancy search early.
fn level_abstraction(level: u32) -> u32 {
    1 << (level & 31)
}

impl Solver {
    /// Resolves the current conflict: learns a clause and backjumps, or flips the last decision
    /// if learning is disabled or the conflict is on the backtrack level. Returns `false` if the
    /// conflict cannot be resolved above the root level; the conflict is kept in that case.
    pub(crate) fn resolve_conflict(&mut self) -> bool {
        aspen_assert_moderate!(self.has_conflict());
        self.statistics.search.conflicts += 1;

        if self.is_infeasible() || self.decision_level() <= self.root_level {
            return false;
        }

        let nogood = self.take_conflict();
        let conflict_level = nogood
            .iter()
            .map(|literal| self.assignments.level(literal.var()))
            .max()
            .unwrap_or(0);
        if conflict_level <= self.root_level {
            self.set_conflict(nogood);
            return false;
        }
        if conflict_level < self.decision_level() {
            self.undo_until(conflict_level);
        }

        if !self.options.learning || self.decision_level() <= self.backtrack_level {
            if !self.backtrack() {
                return false;
            }
            if nogood.iter().all(|&literal| self.is_true(literal)) {
                self.set_conflict(nogood);
            }
            return true;
        }

        let (learnt, uip_level) = self.analyze_conflict(nogood);
        self.statistics
            .update_jumps(self.decision_level(), uip_level, self.backtrack_level);
        self.undo_until(uip_level);
        self.integrate_clause(learnt, ClauseStore::Learnt(ConstraintKind::Conflict))
    }

    /// Derives the first-UIP clause of a conflict on the current decision level. The asserting
    /// literal is at position 0 and a literal of the highest remaining level at position 1; the
    /// returned level is the one to backjump to.
    fn analyze_conflict(&mut self, nogood: Vec<Literal>) -> (Vec<Literal>, u32) {
        let decision_level = self.decision_level();
        let mut learnt = vec![Literal::TRUE];
        let mut marked: Vec<Var> = vec![];
        let mut pending = 0_u32;
        let mut trail_index = self.assignments.trail().len();

        self.heuristic.update_reason(&nogood, None);
        let mut reason = nogood;
        loop {
            for &literal in &reason {
                let var = literal.var();
                if self.assignments.is_seen(var) || self.assignments.level(var) == 0 {
                    continue;
                }
                self.assignments.mark_seen(literal);
                marked.push(var);
                if self.assignments.level(var) == decision_level {
                    pending += 1;
                } else {
                    learnt.push(!literal);
                }
            }

            let resolved = loop {
                trail_index -= 1;
                let literal = self.assignments.trail()[trail_index];
                if self.assignments.is_seen(literal.var()) {
                    break literal;
                }
            };
            pending -= 1;
            if pending == 0 {
                learnt[0] = !resolved;
                break;
            }

            reason.clear();
            let antecedent = self.assignments.reason(resolved.var());
            self.collect_reason(resolved, antecedent, &mut reason);
            self.bump_reason_activity(antecedent);
            self.heuristic.update_reason(&reason, Some(resolved));
        }

        self.minimize_learnt(&mut learnt, &mut marked);

        let uip_level = if learnt.len() > 1 {
            let (position, level) = learnt
                .iter()
                .enumerate()
                .skip(1)
                .map(|(index, literal)| (index, self.assignments.level(literal.var())))
                .max_by_key(|&(_, level)| level)
                .unwrap_or((1, 0));
            learnt.swap(1, position);
            level
        } else {
            0
        };

        for var in marked {
            self.assignments.clear_seen(var);
        }
        (learnt, uip_level)
    }

    fn bump_reason_activity(&mut self, reason: Reason) {
        let Reason::Constraint(constraint) = reason else {
            return;
        };
        let compression = self.options.compression as usize;
        if let Some(clause) = self
            .constraints
            .get_mut(constraint)
            .and_then(|stored| stored.as_clause_mut())
        {
            if compression == 0 || clause.len() <= compression {
                clause.bump_activity();
            }
        }
    }

    /// Removes the literals of `learnt` (except the asserting one) which are implied by the
    /// others.
    fn minimize_learnt(&mut self, learnt: &mut Vec<Literal>, marked: &mut Vec<Var>) {
        let allowed = self.options.antecedents.allowed();
        if allowed.is_empty() || learnt.len() < 2 {
            return;
        }
        let abstraction = learnt[1..].iter().fold(0, |abstraction, literal| {
            abstraction | level_abstraction(self.assignments.level(literal.var()))
        });

        let mut kept = 1;
        for index in 1..learnt.len() {
            let literal = learnt[index];
            let reason = self.assignments.reason(literal.var());
            let redundant = !reason.is_decision()
                && allowed.contains(reason.kind())
                && match self.options.minimization {
                    MinimizationStrategy::Beame => self.is_locally_redundant(!literal),
                    MinimizationStrategy::Een => {
                        self.is_redundant(!literal, abstraction, allowed, marked)
                    }
                };
            if !redundant {
                learnt[kept] = literal;
                kept += 1;
            }
        }
        learnt.truncate(kept);
    }

    /// Whether every literal of the reason of the true literal `literal` is in the clause.
    fn is_locally_redundant(&self, literal: Literal) -> bool {
        let mut reason = vec![];
        self.collect_reason(literal, self.assignments.reason(literal.var()), &mut reason);
        reason.iter().all(|antecedent| {
            self.assignments.is_seen(antecedent.var())
                || self.assignments.level(antecedent.var()) == 0
        })
    }

    /// Whether the true literal `literal` is implied by literals of the clause, following reasons
    /// recursively. Literals shown to be implied stay marked; on failure the marks of this
    /// search are removed again.
    fn is_redundant(
        &mut self,
        literal: Literal,
        abstraction: u32,
        allowed: EnumSet<AntecedentKind>,
        marked: &mut Vec<Var>,
    ) -> bool {
        let first_mark = marked.len();
        let mut stack = vec![literal];
        let mut reason = vec![];

        while let Some(current) = stack.pop() {
            reason.clear();
            self.collect_reason(current, self.assignments.reason(current.var()), &mut reason);
            for &antecedent in &reason {
                let var = antecedent.var();
                let level = self.assignments.level(var);
                if self.assignments.is_seen(var) || level == 0 {
                    continue;
                }
                let antecedent_reason = self.assignments.reason(var);
                if antecedent_reason.is_decision()
                    || !allowed.contains(antecedent_reason.kind())
                    || abstraction & level_abstraction(level) == 0
                {
                    for var in marked.drain(first_mark..) {
                        self.assignments.clear_seen(var);
                    }
                    return false;
                }
                self.assignments.mark_seen(antecedent);
                marked.push(var);
                stack.push(antecedent);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::solver::AntecedentFilter;
    use crate::engine::solver::SolverOptions;
    use crate::engine::variables::VarKind;

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

    #[test]
    fn first_uip_clause_asserts_after_backjumping() {
        let clauses: &[&[i32]] = &[&[-5, 2], &[-5, -1, 3], &[-2, -3, 4], &[-2, -3, -4]];
        let mut solver = solver(SolverOptions::default(), 5, clauses);

        solver.assume(lit(1));
        assert!(solver.propagate());
        solver.assume(lit(5));
        assert!(!solver.propagate());

        assert!(solver.resolve_conflict());
        assert_eq!(solver.decision_level(), 1);
        assert!(solver.is_false(lit(5)));
        assert_eq!(solver.assignments().reason(Var::new(5)), Reason::Binary(lit(1)));
        assert_eq!(solver.statistics().search.conflicts, 1);
        assert_eq!(solver.statistics().constraints.learnt_binary, 1);
        for var in solver.assignments().vars() {
            assert!(!solver.assignments().is_seen(var));
        }
    }

    fn implied_literal_instance(options: SolverOptions) -> Solver {
        let clauses: &[&[i32]] = &[&[-1, 2], &[-3, -2, 4], &[-3, -1, -4]];
        let mut solver = solver(options, 4, clauses);
        solver.assume(lit(1));
        assert!(solver.propagate());
        solver.assume(lit(3));
        assert!(!solver.propagate());
        assert!(solver.resolve_conflict());
        solver
    }

    #[test]
    fn implied_literals_are_removed_from_the_learnt_clause() {
        for minimization in [MinimizationStrategy::Beame, MinimizationStrategy::Een] {
            let options = SolverOptions {
                minimization,
                ..SolverOptions::default()
            };
            let solver = implied_literal_instance(options);

            assert!(solver.is_false(lit(3)));
            assert_eq!(solver.statistics().constraints.learnt_binary, 1);
            assert_eq!(solver.statistics().constraints.learnt_ternary, 0);
        }
    }

    #[test]
    fn antecedent_filter_disables_minimisation() {
        let options = SolverOptions {
            antecedents: AntecedentFilter::None,
            ..SolverOptions::default()
        };
        let solver = implied_literal_instance(options);

        assert!(solver.is_false(lit(3)));
        assert_eq!(solver.statistics().constraints.learnt_ternary, 1);
    }

    #[test]
    fn without_learning_conflicts_flip_the_last_decision() {
        let options = SolverOptions {
            learning: false,
            ..SolverOptions::default()
        };
        let clauses: &[&[i32]] = &[&[-1, -2, 3], &[-1, -2, -3]];
        let mut solver = solver(options, 3, clauses);

        solver.assume(lit(1));
        solver.assume(lit(2));
        assert!(!solver.propagate());
        assert!(solver.resolve_conflict());

        assert_eq!(solver.decision_level(), 1);
        assert_eq!(solver.backtrack_level(), 1);
        assert!(solver.is_false(lit(2)));
        assert_eq!(solver.statistics().constraints.learnts, 0);
    }

    #[test]
    fn conflicts_on_the_root_level_are_not_resolved() {
        let clauses: &[&[i32]] = &[&[-1, 2], &[-1, -2]];
        let mut solver = solver(SolverOptions::default(), 2, clauses);

        solver.assume(lit(1));
        assert!(!solver.propagate());
        solver.set_root_level(1);
        assert!(!solver.resolve_conflict());
        assert!(solver.has_conflict());
    }
}
