//! Root-level simplification and the learnt clause database.
use log::debug;

use super::Solver;
use super::SolverState;
use crate::basic_types::shuffle;
use crate::containers::HashSet;
use crate::engine::constraints::Constraint;
use crate::engine::constraints::ConstraintRef;
use crate::engine::reason::Reason;
use crate::engine::variables::Literal;
use crate::heuristics::DecisionHeuristic;

impl Solver {
    /// Propagates on the root level and removes what the new root-level facts made redundant.
    /// Returns `false` if the constraints are unsatisfiable. Does nothing above the root level.
    pub(crate) fn simplify(&mut self) -> bool {
        if self.decision_level() != 0 {
            return true;
        }
        if !self.propagate() {
            self.state = SolverState::Infeasible;
            return false;
        }
        let trail_len = self.assignments.trail().len();
        if self.last_simplify == trail_len && !self.shuffle_pending {
            return true;
        }

        let start = self.last_simplify;
        let facts: Vec<Literal> = self.assignments.trail()[start..].to_vec();
        for &fact in &facts {
            self.simplify_short(fact);
            self.watch_lists.clear_general(fact);
        }
        self.heuristic.simplify(&self.assignments, start);
        self.last_simplify = trail_len;

        if self.shuffle_pending {
            self.shuffle_pending = false;
            shuffle(&mut self.natives, &mut self.options.random_generator);
            shuffle(&mut self.learnts, &mut self.options.random_generator);
        }
        self.simplify_db(false);
        self.simplify_db(true);
        true
    }

    /// Removes the short clauses satisfied by the root-level fact `p` and shortens the ternary
    /// clauses containing `!p`.
    fn simplify_short(&mut self, p: Literal) {
        self.watch_lists.list_mut(p).binary.clear();
        let _ = self.watch_lists.remove_satisfied_binary(p);
        let _ = self.watch_lists.remove_satisfied_ternary(p);

        for (q, r) in self.watch_lists.take_falsified_ternary(p) {
            if self.assignments.is_free(q.var()) && self.assignments.is_free(r.var()) {
                self.watch_lists.add_binary(q, r);
            }
        }
    }

    /// Simplifies the native or the learnt constraints, deleting those which became redundant.
    fn simplify_db(&mut self, learnt: bool) {
        let mut database = std::mem::take(if learnt {
            &mut self.learnts
        } else {
            &mut self.natives
        });
        database.retain(|&constraint| match self.constraints.get_mut(constraint) {
            None => false,
            Some(stored) => {
                if stored.simplify(&self.assignments) {
                    let _ = self.constraints.remove(constraint);
                    false
                } else {
                    true
                }
            }
        });
        if learnt {
            self.learnts = database;
        } else {
            self.natives = database;
        }
    }

    /// Deletes a clause from the arena; its watches are dropped the next time they are visited.
    pub(crate) fn remove_clause(&mut self, constraint: ConstraintRef) {
        let _ = self.constraints.remove(constraint);
    }

    /// Shuffles the order of the constraint databases on the next simplification.
    pub(crate) fn request_shuffle(&mut self) {
        self.shuffle_pending = true;
    }

    /// Deletes learnt clauses which are not the reason of an assigned literal.
    ///
    /// With `fraction < 1`, at most that fraction of the learnt clauses is removed, considering
    /// only clauses whose activity is at most 1.5 times the average; the activity of every kept
    /// clause is halved. With `fraction >= 1` every unlocked learnt clause is removed.
    pub(crate) fn reduce_learnts(&mut self, fraction: f64) {
        let learnts = std::mem::take(&mut self.learnts);
        let locked: HashSet<ConstraintRef> = self
            .implied
            .iter()
            .filter_map(|implied| match implied.reason {
                Reason::Constraint(constraint) => Some(constraint),
                _ => None,
            })
            .collect();

        let (limit, threshold) = if fraction < 1.0 {
            let total: f64 = learnts
                .iter()
                .filter_map(|&learnt| self.constraints.get(learnt))
                .filter_map(|stored| stored.as_clause())
                .map(|clause| f64::from(clause.activity()))
                .sum();
            let average = total / learnts.len().max(1) as f64;
            ((learnts.len() as f64 * fraction) as usize, average * 1.5)
        } else {
            (usize::MAX, f64::INFINITY)
        };

        let mut removed = 0;
        for learnt in learnts {
            let Some(clause) = self
                .constraints
                .get_mut(learnt)
                .and_then(|stored| stored.as_clause_mut())
            else {
                continue;
            };
            let removable = removed < limit
                && f64::from(clause.activity()) <= threshold
                && !clause.is_locked(learnt, &self.assignments)
                && !locked.contains(&learnt);
            if removable {
                let _ = self.constraints.remove(learnt);
                removed += 1;
            } else {
                clause.decay_activity();
                self.learnts.push(learnt);
            }
        }

        self.statistics.constraints.deleted += removed as u64;
        debug!(
            "Removed {removed} learnt clauses, {} remain",
            self.learnts.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraints::ConstraintKind;
    use crate::engine::solver::constraint_creation::ClauseStore;
    use crate::engine::variables::VarKind;

    fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    fn solver_with_vars(num_vars: u32) -> Solver {
        let mut solver = Solver::default();
        for _ in 0..num_vars {
            let _ = solver.add_var(VarKind::Atom);
        }
        solver.start_add_constraints();
        solver
    }

    #[test]
    fn root_facts_remove_satisfied_clauses() {
        let mut solver = solver_with_vars(6);
        solver
            .add_clause([lit(1), lit(2), lit(3), lit(4)])
            .expect("no conflict");
        solver
            .add_clause([lit(-1), lit(2), lit(5), lit(6)])
            .expect("no conflict");
        solver.add_unary(lit(1)).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        // The first clause is satisfied, the second one lost a literal.
        assert_eq!(solver.natives.len(), 1);
        let remaining = solver
            .constraints
            .get(solver.natives[0])
            .and_then(|stored| stored.as_clause())
            .map(|clause| clause.len());
        assert_eq!(remaining, Some(3));
    }

    #[test]
    fn falsified_ternary_clauses_become_binary() {
        let mut solver = solver_with_vars(3);
        solver
            .add_clause([lit(-1), lit(2), lit(3)])
            .expect("no conflict");
        solver.add_unary(lit(1)).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        assert_eq!(solver.watch_lists().binary_implications(lit(-2)), &[lit(3)]);
        assert_eq!(solver.watch_lists().num_ternary(lit(-2)), 0);
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut solver = solver_with_vars(5);
        solver
            .add_clause([lit(1), lit(2), lit(3), lit(4)])
            .expect("no conflict");
        solver.add_clause([lit(-5), lit(1)]).expect("no conflict");
        solver.add_unary(lit(5)).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        let natives = solver.natives.clone();
        let values: Vec<_> = solver.assignments().vars().map(|var| solver.value(var)).collect();
        assert!(solver.simplify());
        assert_eq!(solver.natives, natives);
        let again: Vec<_> = solver.assignments().vars().map(|var| solver.value(var)).collect();
        assert_eq!(values, again);
    }

    #[test]
    fn reduction_keeps_locked_and_active_clauses() {
        let mut solver = solver_with_vars(8);
        assert!(solver.end_add_constraints(false));

        for (first, last) in [(1, 6), (2, 7), (3, 8)] {
            let clause = vec![lit(first), lit(4), lit(5), lit(last)];
            assert!(solver.integrate_clause(clause, ClauseStore::Learnt(ConstraintKind::Conflict)));
        }
        // Make the last clause the reason of x3.
        solver.assume(lit(-4));
        solver.assume(lit(-5));
        solver.assume(lit(-8));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(3)));
        assert_eq!(solver.num_learnt_constraints(), 3);

        solver.reduce_learnts(1.0);
        assert_eq!(solver.num_learnt_constraints(), 1);
        assert_eq!(solver.statistics().constraints.deleted, 2);
    }
}
