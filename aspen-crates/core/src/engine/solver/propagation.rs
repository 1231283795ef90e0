use super::constraint_creation::ClauseStore;
use super::ImpliedLiteral;
use super::Solver;
use crate::aspen_assert_moderate;
use crate::aspen_assert_simple;
use crate::engine::constraints::force_literal;
use crate::engine::constraints::Constraint;
use crate::engine::constraints::ConstraintKind;
use crate::engine::constraints::ConstraintRef;
use crate::engine::constraints::PropagationContext;
use crate::engine::reason::Reason;
use crate::engine::variables::Literal;
use crate::heuristics::DecisionHeuristic;

/// What the unfounded-set check did at a propagation fixpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopCheck {
    /// No unfounded set exists.
    Fixpoint,
    /// Loop nogoods were added and forced new literals.
    Propagated,
    Conflict,
}

impl Solver {
    /// Makes `literal` true with the given reason on the current level; records a conflict and
    /// returns `false` if it is false already.
    pub(crate) fn force(&mut self, literal: Literal, reason: Reason) -> bool {
        aspen_assert_moderate!(!self.assignments.is_eliminated(literal.var()));
        force_literal(
            &mut self.assignments,
            &mut self.conflict_info,
            literal,
            reason,
        )
    }

    /// Opens a new decision level with `literal` as its decision.
    pub(crate) fn assume(&mut self, literal: Literal) {
        aspen_assert_simple!(self.assignments.is_free(literal.var()));
        self.statistics.search.choices += 1;
        self.assignments.new_decision_level();
        self.level_conflicts.push(self.statistics.search.conflicts);
        self.assignments.assign(literal, Reason::Decision);
    }

    /// Propagates the literals on the queue to a fixpoint, running the unfounded-set check
    /// whenever unit propagation reached one. Returns `false` on a conflict.
    pub(crate) fn propagate(&mut self) -> bool {
        if self.has_conflict() {
            return false;
        }
        loop {
            if !self.unit_propagate() {
                self.queue_front = self.assignments.trail().len();
                return false;
            }
            match self.check_unfounded_sets() {
                LoopCheck::Fixpoint => return true,
                LoopCheck::Propagated => {}
                LoopCheck::Conflict => {
                    self.queue_front = self.assignments.trail().len();
                    return false;
                }
            }
        }
    }

    fn unit_propagate(&mut self) -> bool {
        while self.queue_front < self.assignments.trail().len() {
            let literal = self.assignments.trail()[self.queue_front];
            self.queue_front += 1;

            let list = self.watch_lists.list(literal);
            for &implied in &list.binary {
                if !force_literal(
                    &mut self.assignments,
                    &mut self.conflict_info,
                    implied,
                    Reason::Binary(literal),
                ) {
                    return false;
                }
            }
            for &(first, second) in &list.ternary {
                if self.assignments.is_true(first) || self.assignments.is_true(second) {
                    continue;
                }
                if self.assignments.is_false(second) {
                    if !force_literal(
                        &mut self.assignments,
                        &mut self.conflict_info,
                        first,
                        Reason::Ternary(literal, !second),
                    ) {
                        return false;
                    }
                } else if self.assignments.is_false(first)
                    && !force_literal(
                        &mut self.assignments,
                        &mut self.conflict_info,
                        second,
                        Reason::Ternary(literal, !first),
                    )
                {
                    return false;
                }
            }

            if !self.watch_lists.list(literal).general.is_empty()
                && !self.propagate_general(literal)
            {
                return false;
            }
        }
        true
    }

    /// Notifies every constraint in the general watch list of `literal`. Watches of removed
    /// constraints are dropped on the way.
    fn propagate_general(&mut self, literal: Literal) -> bool {
        let mut watches = std::mem::take(&mut self.watch_lists.list_mut(literal).general);
        let mut kept = 0;
        let mut index = 0;
        let mut ok = true;

        while index < watches.len() {
            let watch = watches[index];
            index += 1;
            let Some(constraint) = self.constraints.get_mut(watch.constraint) else {
                continue;
            };
            let mut context = PropagationContext {
                assignments: &mut self.assignments,
                watch_lists: &mut self.watch_lists,
                undo_lists: &mut self.undo_lists,
                conflict: &mut self.conflict_info,
                constraint: watch.constraint,
            };
            let result = constraint.propagate(literal, watch.data, &mut context);
            if result.keep_watch {
                watches[kept] = watch;
                kept += 1;
            }
            if !result.ok {
                ok = false;
                break;
            }
        }

        while index < watches.len() {
            watches[kept] = watches[index];
            kept += 1;
            index += 1;
        }
        watches.truncate(kept);

        // Constraints may have added watches for `literal` in the meantime.
        let list = &mut self.watch_lists.list_mut(literal).general;
        watches.append(list);
        *list = watches;
        ok
    }

    /// Delivers a single watch event to a constraint outside of the propagation queue, used for
    /// literals which were already assigned when the constraint was added.
    pub(crate) fn propagate_constraint(
        &mut self,
        constraint: ConstraintRef,
        literal: Literal,
        data: u32,
    ) -> bool {
        let Some(stored) = self.constraints.get_mut(constraint) else {
            return true;
        };
        let mut context = PropagationContext {
            assignments: &mut self.assignments,
            watch_lists: &mut self.watch_lists,
            undo_lists: &mut self.undo_lists,
            conflict: &mut self.conflict_info,
            constraint,
        };
        stored.propagate(literal, data, &mut context).ok
    }

    fn check_unfounded_sets(&mut self) -> LoopCheck {
        let Some(check) = self
            .unfounded
            .and_then(|unfounded| self.constraints.get_mut(unfounded))
            .and_then(|constraint| constraint.as_unfounded_mut())
        else {
            return LoopCheck::Fixpoint;
        };
        let Some(nogood) = check.find_unfounded_set(&self.assignments) else {
            return LoopCheck::Fixpoint;
        };
        // The set stays unfounded until the loop nogoods made its atoms false.
        check.mark_dirty();

        let mut propagated = false;
        for &atom in &nogood.atoms {
            if self.assignments.is_false(atom) {
                continue;
            }
            let mut clause = Vec::with_capacity(nogood.external.len() + 1);
            clause.push(!atom);
            clause.extend_from_slice(&nogood.external);

            let atom_was_free = self.assignments.is_free(atom.var());
            if !self.integrate_clause(clause, ClauseStore::Learnt(ConstraintKind::Loop)) {
                return LoopCheck::Conflict;
            }
            propagated |= atom_was_free;
        }
        if propagated {
            LoopCheck::Propagated
        } else {
            LoopCheck::Fixpoint
        }
    }

    /// Appends the true literals which implied `literal` (through `reason`) to `out`.
    pub(crate) fn collect_reason(&self, literal: Literal, reason: Reason, out: &mut Vec<Literal>) {
        match reason {
            Reason::Decision => {}
            Reason::Binary(first) => out.push(first),
            Reason::Ternary(first, second) => {
                out.push(first);
                out.push(second);
            }
            Reason::Constraint(constraint) => {
                if let Some(stored) = self.constraints.get(constraint) {
                    stored.reason(literal, &self.assignments, out);
                } else {
                    aspen_assert_simple!(false, "the reason of {literal} was removed");
                }
            }
        }
    }

    /// Replaces the current conflict by `nogood`, a set of true literals which must not all be
    /// true together.
    pub(crate) fn set_conflict(&mut self, nogood: Vec<Literal>) {
        aspen_assert_simple!(!nogood.is_empty());
        self.conflict_info = None;
        self.conflict_nogood = nogood;
    }

    /// Takes the current conflict out of the solver as a set of true literals.
    pub(crate) fn take_conflict(&mut self) -> Vec<Literal> {
        match self.conflict_info.take() {
            Some(info) => {
                let mut nogood = vec![!info.literal];
                self.collect_reason(info.literal, info.reason, &mut nogood);
                nogood
            }
            None => std::mem::take(&mut self.conflict_nogood),
        }
    }

    fn clear_conflict(&mut self) {
        self.conflict_info = None;
        self.conflict_nogood.clear();
    }

    /// Undoes every decision level above `level`, but never goes below the backtrack level.
    /// Implied literals whose level is still on the trail are asserted again.
    pub fn undo_until(&mut self, level: u32) {
        let level = level.max(self.backtrack_level);
        if level >= self.decision_level() {
            return;
        }
        self.clear_conflict();
        let start = self.assignments.level_start(level + 1);
        self.heuristic.undo_until(&self.assignments, start);

        let mut save_phase = false;
        while self.decision_level() > level {
            self.undo_level(save_phase);
            save_phase = self.options.save_progress;
        }
        self.queue_front = self.queue_front.min(self.assignments.trail().len());

        if !self.implied.is_empty() {
            let implied = std::mem::take(&mut self.implied);
            for implied_literal in implied {
                if implied_literal.level > level {
                    continue;
                }
                let _ = self.force(implied_literal.literal, implied_literal.reason);
                if implied_literal.level < level {
                    self.implied.push(implied_literal);
                }
            }
        }
    }

    /// Removes the top decision level: constraints registered for it are notified before its
    /// literals are freed.
    fn undo_level(&mut self, save_phase: bool) {
        let level = self.decision_level();
        for constraint in self.undo_lists.take_level(level) {
            if let Some(stored) = self.constraints.get_mut(constraint) {
                stored.undo_level(level, &self.assignments);
            }
        }
        self.assignments.undo_level(save_phase);
        let _ = self.level_conflicts.pop();

        while let Some(&(nogood, nogood_level)) = self.scoped_nogoods.last() {
            if nogood_level < level {
                break;
            }
            let _ = self.scoped_nogoods.pop();
            self.remove_clause(nogood);
        }
    }

    /// Flips the decision of the current level on the level below, which becomes the new
    /// backtrack level. Repeats while flipping fails; returns `false` once the root level is
    /// reached.
    pub fn backtrack(&mut self) -> bool {
        loop {
            let level = self.decision_level();
            if level <= self.root_level {
                return false;
            }
            let flipped = !self.assignments.decision(level);
            self.backtrack_level = level - 1;
            self.undo_until(self.backtrack_level);

            if !self.has_conflict() && self.force(flipped, Reason::Decision) {
                return true;
            }
        }
    }

    /// Lets the minimize constraint force false every free literal which would exceed the
    /// optimum. Needed after the optimum changed, since no watch event reports that.
    pub(crate) fn backpropagate_minimize(&mut self) -> bool {
        let Some(handle) = self.minimize else {
            return true;
        };
        let Some(minimize) = self
            .constraints
            .get_mut(handle)
            .and_then(|constraint| constraint.as_minimize_mut())
        else {
            return true;
        };
        let mut context = PropagationContext {
            assignments: &mut self.assignments,
            watch_lists: &mut self.watch_lists,
            undo_lists: &mut self.undo_lists,
            conflict: &mut self.conflict_info,
            constraint: handle,
        };
        minimize.backpropagate(&mut context)
    }

    /// Remembers that `literal`, asserted on the current level, is implied on `level` already.
    pub(crate) fn add_implied_literal(&mut self, literal: Literal, level: u32) {
        let reason = self.assignments.reason(literal.var());
        self.implied.push(ImpliedLiteral {
            literal,
            level,
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::WeightedLiteral;
    use crate::engine::variables::Value;
    use crate::engine::variables::Var;
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
    fn binary_and_ternary_clauses_propagate() {
        let mut solver = solver_with_vars(4);
        solver.add_clause([lit(1), lit(2)]).expect("no conflict");
        solver
            .add_clause([lit(-2), lit(3), lit(4)])
            .expect("no conflict");
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-1));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(2)));
        assert_eq!(solver.assignments().reason(Var::new(2)), Reason::Binary(lit(-1)));

        solver.assume(lit(-3));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(4)));
        assert_eq!(
            solver.assignments().reason(Var::new(4)),
            Reason::Ternary(lit(-3), lit(2))
        );
    }

    #[test]
    fn undo_frees_every_literal_above_the_target_level() {
        let mut solver = solver_with_vars(4);
        solver.add_clause([lit(1), lit(2)]).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-1));
        assert!(solver.propagate());
        solver.assume(lit(3));
        assert!(solver.propagate());
        solver.assume(lit(4));
        assert!(solver.propagate());

        solver.undo_until(1);
        assert_eq!(solver.decision_level(), 1);
        assert!(solver.is_true(lit(2)));
        assert_eq!(solver.value(Var::new(3)), Value::Free);
        assert_eq!(solver.value(Var::new(4)), Value::Free);
        for var in solver.assignments().vars() {
            assert!(solver.assignments().is_free(var) || solver.assignments().level(var) <= 1);
        }
    }

    #[test]
    fn backtracking_flips_the_last_decision_and_raises_the_backtrack_level() {
        let mut solver = solver_with_vars(3);
        solver.add_clause([lit(1), lit(2), lit(3)]).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-1));
        solver.assume(lit(-2));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(3)));

        assert!(solver.backtrack());
        assert_eq!(solver.decision_level(), 1);
        assert_eq!(solver.backtrack_level(), 1);
        assert!(solver.is_true(lit(2)));
        assert_eq!(solver.value(Var::new(3)), Value::Free);

        // Undoing never goes below the backtrack level.
        solver.undo_until(0);
        assert_eq!(solver.decision_level(), 1);
    }

    #[test]
    fn weight_constraint_events_are_undone_before_variables_are_freed() {
        let mut solver = solver_with_vars(4);
        let elements = [lit(2), lit(3), lit(4)].map(WeightedLiteral::from);
        solver
            .add_weight_constraint(lit(1), elements, 2)
            .expect("valid constraint");
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-2));
        solver.assume(lit(-3));
        assert!(solver.propagate());
        assert!(solver.is_false(lit(1)));

        solver.undo_until(1);
        assert_eq!(solver.value(Var::new(1)), Value::Free);
        solver.assume(lit(3));
        solver.assume(lit(4));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(1)));
    }
}
