use super::Solver;
use super::SolverState;
use crate::aspen_assert_simple;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::WeightedLiteral;
use crate::containers::HashSet;
use crate::engine::constraints::Clause;
use crate::engine::constraints::ConstraintKind;
use crate::engine::constraints::LearntInfo;
use crate::engine::constraints::MinimizeConstraint;
use crate::engine::constraints::StoredConstraint;
use crate::engine::constraints::UnfoundedCheck;
use crate::engine::constraints::WeightConstraint;
use crate::engine::reason::Reason;
use crate::engine::variables::Literal;
use crate::engine::variables::Value;
use crate::engine::watch_lists::Watch;
use crate::heuristics::DecisionHeuristic;

/// Where a clause created during search is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClauseStore {
    /// A problem clause, never deleted.
    Native,
    /// A learnt clause which may be deleted when the learnt database is reduced.
    Learnt(ConstraintKind),
    /// A clause which is deleted once the current decision level is undone.
    Scoped,
}

impl Solver {
    fn check_can_add(&self) -> Result<(), ConstraintOperationError> {
        match self.state {
            SolverState::Infeasible => Err(ConstraintOperationError::InfeasibleState),
            SolverState::Ready => Err(ConstraintOperationError::AddingConstraintsAfterInit),
            SolverState::Adding if self.decision_level() > 0 => {
                Err(ConstraintOperationError::AddingConstraintsAfterInit)
            }
            SolverState::Adding => Ok(()),
        }
    }

    /// Checks that the variable of `literal` exists and brings it back if it was eliminated.
    fn prepare_literal(&mut self, literal: Literal) -> Result<(), ConstraintOperationError> {
        let var = literal.var();
        if var.is_sentinel() {
            return Ok(());
        }
        if !self.is_valid_var(var) {
            return Err(ConstraintOperationError::InvalidVariable(var));
        }
        if self.assignments.is_eliminated(var) {
            self.eliminate(var, false)?;
        }
        Ok(())
    }

    /// Adds the clause `literals[0] | literals[1] | ...` to the problem.
    ///
    /// Duplicate literals and literals which are false at the root are removed; tautologies and
    /// clauses satisfied at the root are dropped. An empty clause makes the solver infeasible.
    pub fn add_clause(
        &mut self,
        literals: impl IntoIterator<Item = Literal>,
    ) -> Result<(), ConstraintOperationError> {
        self.check_can_add()?;

        let mut clause = vec![];
        for literal in literals {
            self.prepare_literal(literal)?;
            match self.assignments.literal_value(literal) {
                Value::True => return Ok(()),
                Value::False => {}
                Value::Free => clause.push(literal),
            }
        }
        clause.sort_unstable();
        clause.dedup();
        if clause
            .windows(2)
            .any(|pair| pair[0].var() == pair[1].var())
        {
            return Ok(());
        }

        match clause.len() {
            0 => {
                self.state = SolverState::Infeasible;
                Err(ConstraintOperationError::InfeasibleClause)
            }
            1 => {
                let _ = self.force(clause[0], Reason::Decision);
                Ok(())
            }
            _ => {
                self.heuristic
                    .new_constraint(&self.assignments, &clause, ConstraintKind::Static);
                let _ = self.store_clause(&clause, ClauseStore::Native);
                Ok(())
            }
        }
    }

    pub fn add_unary(&mut self, literal: Literal) -> Result<(), ConstraintOperationError> {
        self.add_clause([literal])
    }

    pub fn add_binary(
        &mut self,
        first: Literal,
        second: Literal,
    ) -> Result<(), ConstraintOperationError> {
        self.add_clause([first, second])
    }

    pub fn add_ternary(
        &mut self,
        first: Literal,
        second: Literal,
        third: Literal,
    ) -> Result<(), ConstraintOperationError> {
        self.add_clause([first, second, third])
    }

    /// Adds `literal <-> sum(weight * element) >= bound`.
    ///
    /// The elements are normalised first: root-level assignments are folded into the bound,
    /// repeated literals are merged, complementary literals cancel out and weights are capped at
    /// the bound. Constraints which are trivial afterwards become unit clauses; disjunctions and
    /// conjunctions are encoded as clauses; everything else is a [`WeightConstraint`].
    pub fn add_weight_constraint(
        &mut self,
        literal: Literal,
        elements: impl IntoIterator<Item = WeightedLiteral>,
        bound: i64,
    ) -> Result<(), ConstraintOperationError> {
        self.check_can_add()?;
        self.prepare_literal(literal)?;
        if bound < 0 {
            return Err(ConstraintOperationError::NegativeBound(bound));
        }

        let mut bound = bound;
        let mut free = vec![];
        for element in elements {
            self.prepare_literal(element.literal)?;
            if element.weight < 0 {
                return Err(ConstraintOperationError::NegativeWeight(element.weight));
            }
            if element.weight == 0 {
                continue;
            }
            match self.assignments.literal_value(element.literal) {
                Value::True => {
                    bound = bound
                        .checked_sub(element.weight)
                        .ok_or(ConstraintOperationError::WeightOverflow)?;
                }
                Value::False => {}
                Value::Free => free.push(element),
            }
        }
        let mut elements = merge_elements(free, &mut bound)?;

        let sum = elements
            .iter()
            .try_fold(0_i64, |sum, element| sum.checked_add(element.weight))
            .ok_or(ConstraintOperationError::WeightOverflow)?;
        if bound <= 0 {
            return self.add_clause([literal]);
        }
        if sum < bound {
            return self.add_clause([!literal]);
        }

        for element in elements.iter_mut() {
            element.weight = element.weight.min(bound);
        }
        let sum: i64 = elements.iter().map(|element| element.weight).sum();
        let min_weight = elements
            .iter()
            .map(|element| element.weight)
            .min()
            .unwrap_or(0);

        if elements.iter().all(|element| element.weight == bound) {
            // literal <-> any element
            self.add_clause(
                std::iter::once(!literal).chain(elements.iter().map(|element| element.literal)),
            )?;
            for element in &elements {
                self.add_clause([literal, !element.literal])?;
            }
            return Ok(());
        }
        if sum - min_weight < bound {
            // literal <-> all elements
            self.add_clause(
                std::iter::once(literal).chain(elements.iter().map(|element| !element.literal)),
            )?;
            for element in &elements {
                self.add_clause([!literal, element.literal])?;
            }
            return Ok(());
        }

        let mut literals = vec![literal];
        literals.extend(elements.iter().map(|element| element.literal));
        self.heuristic
            .new_constraint(&self.assignments, &literals, ConstraintKind::Static);

        let constraint = WeightConstraint::new(literal, elements, bound);
        let watches: Vec<_> = constraint.watches().collect();
        let pending = constraint.pending_body_event(&self.assignments);
        let handle = self.constraints.insert(StoredConstraint::Weight(constraint));
        for (watched, data) in watches {
            self.watch_lists.add_watch(
                watched,
                Watch {
                    constraint: handle,
                    data,
                },
            );
        }
        self.natives.push(handle);

        if let Some((event, data)) = pending.filter(|&(event, _)| self.is_propagated(event)) {
            if !self.propagate_constraint(handle, event, data) {
                self.state = SolverState::Infeasible;
                return Err(ConstraintOperationError::InfeasibleClause);
            }
        }
        Ok(())
    }

    /// Installs the minimize constraint of the problem. Its literals are frozen.
    pub fn add_minimize(
        &mut self,
        constraint: MinimizeConstraint,
    ) -> Result<(), ConstraintOperationError> {
        self.check_can_add()?;
        aspen_assert_simple!(self.minimize.is_none(), "only one minimize constraint is supported");

        let literals: Vec<_> = constraint.literals().collect();
        for &literal in &literals {
            self.prepare_literal(literal)?;
            self.freeze(literal.var());
        }

        let watches: Vec<_> = constraint.watches().collect();
        let handle = self
            .constraints
            .insert(StoredConstraint::Minimize(constraint));
        for &(watched, data) in &watches {
            self.watch_lists.add_watch(
                watched,
                Watch {
                    constraint: handle,
                    data,
                },
            );
        }
        self.minimize = Some(handle);

        // Literals behind the queue front are not propagated again, so the constraint receives
        // them here. The others reach it through its watches.
        let propagated: HashSet<Literal> = self.assignments.trail()[..self.queue_front]
            .iter()
            .copied()
            .collect();
        for (watched, data) in watches {
            if propagated.contains(&watched) && !self.propagate_constraint(handle, watched, data) {
                self.state = SolverState::Infeasible;
                return Err(ConstraintOperationError::InfeasibleClause);
            }
        }
        Ok(())
    }

    /// Installs the unfounded-set check. Its variables are frozen.
    pub fn set_unfounded_check(
        &mut self,
        check: UnfoundedCheck,
    ) -> Result<(), ConstraintOperationError> {
        self.check_can_add()?;
        if check.is_empty() {
            return Ok(());
        }
        let vars: Vec<_> = check.vars().collect();
        for var in vars {
            self.prepare_literal(Literal::positive(var))?;
            self.freeze(var);
        }

        let watches: Vec<_> = check.watches().collect();
        let handle = self.constraints.insert(StoredConstraint::Unfounded(check));
        for (watched, data) in watches {
            self.watch_lists.add_watch(
                watched,
                Watch {
                    constraint: handle,
                    data,
                },
            );
        }
        self.unfounded = Some(handle);
        Ok(())
    }

    /// Adds a clause during search and asserts its first literal if it is unit.
    ///
    /// Literals false at the root are removed. The remaining literals are ordered such that the
    /// first one is true or free if possible (otherwise the false literal of highest level), and
    /// the second one is the literal of highest level among the rest. If every literal is false,
    /// a conflict is set and `false` is returned.
    pub(crate) fn integrate_clause(&mut self, literals: Vec<Literal>, store: ClauseStore) -> bool {
        let mut clause = Vec::with_capacity(literals.len());
        for literal in literals {
            let root_level = self.assignments.level(literal.var()) == 0;
            match self.assignments.literal_value(literal) {
                Value::True if root_level => return true,
                Value::False if root_level => {}
                _ => clause.push(literal),
            }
        }
        clause.sort_unstable();
        clause.dedup();
        if clause
            .windows(2)
            .any(|pair| pair[0].var() == pair[1].var())
        {
            return true;
        }
        if clause.is_empty() {
            self.state = SolverState::Infeasible;
            self.set_conflict(vec![Literal::TRUE]);
            return false;
        }
        self.order_watches(&mut clause);

        let kind = match store {
            ClauseStore::Learnt(kind) => {
                self.statistics.add_learnt(clause.len(), kind);
                kind
            }
            ClauseStore::Native | ClauseStore::Scoped => ConstraintKind::Static,
        };
        self.heuristic
            .new_constraint(&self.assignments, &clause, kind);

        if clause.len() == 1 {
            return if store == ClauseStore::Scoped {
                self.force(clause[0], Reason::Decision)
            } else {
                self.assert_root_unit(clause[0])
            };
        }

        let reason = self.store_clause(&clause, store);
        let first = clause[0];
        let second = clause[1];
        if !self.is_false(second) {
            return true;
        }
        if self.is_false(first) {
            self.set_conflict(clause.iter().map(|&literal| !literal).collect());
            return false;
        }
        if self.assignments.is_free(first.var()) {
            let _ = self.force(first, reason);
            let level = self.assignments.level(second.var());
            if level < self.decision_level() && store != ClauseStore::Scoped {
                self.add_implied_literal(first, level);
            }
        }
        true
    }

    /// Whether `literal` is true and was already taken from the propagation queue.
    fn is_propagated(&self, literal: Literal) -> bool {
        self.assignments.trail()[..self.queue_front].contains(&literal)
    }

    /// Asserts a literal which holds at the root, independent of the current decision level.
    fn assert_root_unit(&mut self, literal: Literal) -> bool {
        if self.decision_level() == 0 {
            return self.force(literal, Reason::Decision);
        }
        // Stored before forcing, so a conflicting unit is asserted again once the search
        // backtracks past the conflict.
        let root_reason = Reason::Binary(Literal::TRUE);
        self.implied.push(super::ImpliedLiteral {
            literal,
            level: 0,
            reason: root_reason,
        });
        self.force(literal, root_reason)
    }

    fn order_watches(&self, clause: &mut [Literal]) {
        let rank = |literal: Literal| match self.assignments.literal_value(literal) {
            Value::True => (2, u32::MAX - self.assignments.level(literal.var())),
            Value::Free => (1, 0),
            Value::False => (0, self.assignments.level(literal.var())),
        };
        for watch in 0..clause.len().min(2) {
            let best = (watch..clause.len())
                .max_by_key(|&index| rank(clause[index]))
                .unwrap_or(watch);
            clause.swap(watch, best);
        }
    }

    /// Stores a clause of at least two literals and returns the reason with which it implies its
    /// first literal.
    fn store_clause(&mut self, clause: &[Literal], store: ClauseStore) -> Reason {
        aspen_assert_simple!(clause.len() >= 2);
        let learnt = match store {
            ClauseStore::Learnt(kind) => Some(kind),
            ClauseStore::Native | ClauseStore::Scoped => None,
        };

        if store != ClauseStore::Scoped && clause.len() <= 3 {
            if clause.len() == 2 {
                self.watch_lists.add_binary(clause[0], clause[1]);
                if learnt.is_none() {
                    self.num_binary += 1;
                }
                return Reason::Binary(!clause[1]);
            }
            self.watch_lists
                .add_ternary(clause[0], clause[1], clause[2]);
            if learnt.is_none() {
                self.num_ternary += 1;
            }
            return Reason::Ternary(!clause[1], !clause[2]);
        }

        let stored = Clause::new(clause.to_vec(), learnt.map(LearntInfo::new));
        let watched = stored.watched_literals();
        let handle = self.constraints.insert(StoredConstraint::Clause(stored));
        for literal in watched {
            self.watch_lists.add_watch(
                literal,
                Watch {
                    constraint: handle,
                    data: 0,
                },
            );
        }
        match store {
            ClauseStore::Native => self.natives.push(handle),
            ClauseStore::Learnt(_) => self.learnts.push(handle),
            ClauseStore::Scoped => {
                let level = self.decision_level();
                self.scoped_nogoods.push((handle, level));
            }
        }
        Reason::Constraint(handle)
    }
}

/// Merges repeated literals and cancels complementary ones, lowering `bound` accordingly.
fn merge_elements(
    mut elements: Vec<WeightedLiteral>,
    bound: &mut i64,
) -> Result<Vec<WeightedLiteral>, ConstraintOperationError> {
    elements.sort_by_key(|element| element.literal);

    let mut merged: Vec<WeightedLiteral> = Vec::with_capacity(elements.len());
    for element in elements {
        match merged.last_mut() {
            Some(last) if last.literal == element.literal => {
                last.weight = last
                    .weight
                    .checked_add(element.weight)
                    .ok_or(ConstraintOperationError::WeightOverflow)?;
            }
            _ => merged.push(element),
        }
    }

    // `p` and `!p` are adjacent after sorting: w1 * p + w2 * !p = min(w1, w2) + rest.
    let mut result = Vec::with_capacity(merged.len());
    let mut index = 0;
    while index < merged.len() {
        let element = merged[index];
        match merged.get(index + 1) {
            Some(next) if next.literal.var() == element.literal.var() => {
                let common = element.weight.min(next.weight);
                *bound -= common;
                for remaining in [element, *next] {
                    if remaining.weight > common {
                        result.push(WeightedLiteral::new(
                            remaining.literal,
                            remaining.weight - common,
                        ));
                    }
                }
                index += 2;
            }
            _ => {
                result.push(element);
                index += 1;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraints::MinimizeMode;
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

    fn weighted(id: i32, weight: i64) -> WeightedLiteral {
        WeightedLiteral::new(lit(id), weight)
    }

    #[test]
    fn duplicates_are_removed_and_tautologies_dropped() {
        let mut solver = solver_with_vars(3);
        solver.add_clause([lit(1), lit(1), lit(2)]).expect("no conflict");
        solver.add_clause([lit(1), lit(-1), lit(3)]).expect("no conflict");

        assert_eq!(solver.num_binary_constraints(), 1);
        assert_eq!(solver.num_ternary_constraints(), 0);
        assert_eq!(solver.num_constraints(), 1);
    }

    #[test]
    fn root_literals_shorten_clauses() {
        let mut solver = solver_with_vars(4);
        solver.add_unary(lit(-1)).expect("no conflict");
        solver
            .add_clause([lit(1), lit(2), lit(3), lit(4)])
            .expect("no conflict");
        solver.add_clause([lit(-1), lit(2)]).expect("no conflict");

        assert!(solver.is_false(lit(1)));
        assert_eq!(solver.num_ternary_constraints(), 1);
        assert_eq!(solver.num_binary_constraints(), 0);
    }

    #[test]
    fn constraints_cannot_be_added_after_initialisation() {
        let mut solver = solver_with_vars(2);
        assert!(solver.end_add_constraints(false));
        assert_eq!(
            solver.add_clause([lit(1), lit(2)]),
            Err(ConstraintOperationError::AddingConstraintsAfterInit)
        );
    }

    #[test]
    fn unknown_variables_are_rejected() {
        let mut solver = solver_with_vars(2);
        assert_eq!(
            solver.add_clause([lit(1), lit(7)]),
            Err(ConstraintOperationError::InvalidVariable(Var::new(7)))
        );
    }

    #[test]
    fn malformed_weight_constraints_fail_fast() {
        let mut solver = solver_with_vars(3);
        assert_eq!(
            solver.add_weight_constraint(lit(1), [weighted(2, 1)], -1),
            Err(ConstraintOperationError::NegativeBound(-1))
        );
        assert_eq!(
            solver.add_weight_constraint(lit(1), [weighted(2, -3)], 1),
            Err(ConstraintOperationError::NegativeWeight(-3))
        );
        assert_eq!(
            solver.add_weight_constraint(lit(1), [weighted(2, i64::MAX), weighted(3, 1)], 1),
            Err(ConstraintOperationError::WeightOverflow)
        );
    }

    #[test]
    fn root_true_weights_cannot_overflow_the_bound() {
        let mut solver = solver_with_vars(4);
        solver.add_unary(lit(2)).expect("no conflict");
        solver.add_unary(lit(3)).expect("no conflict");
        assert_eq!(
            solver.add_weight_constraint(
                lit(1),
                [weighted(2, i64::MAX), weighted(3, i64::MAX), weighted(4, 1)],
                1
            ),
            Err(ConstraintOperationError::WeightOverflow)
        );
    }

    #[test]
    fn root_literals_reach_the_minimize_constraint_once() {
        let mut solver = solver_with_vars(3);
        solver.add_unary(lit(1)).expect("no conflict");
        assert!(solver.propagate());
        solver.add_unary(lit(2)).expect("no conflict");

        let mut minimize = MinimizeConstraint::new(MinimizeMode::Less);
        minimize.add_rule([weighted(1, 2), weighted(2, 1), weighted(3, 4)]);
        solver.add_minimize(minimize).expect("minimize is added once");
        assert!(solver.end_add_constraints(false));

        let sums = solver.minimize_constraint().map(MinimizeConstraint::sums);
        assert_eq!(sums, Some(&[3][..]));
    }

    #[test]
    fn trivial_weight_constraints_become_units() {
        let mut solver = solver_with_vars(4);
        solver
            .add_weight_constraint(lit(1), [weighted(3, 2), weighted(4, 2)], 0)
            .expect("valid constraint");
        solver
            .add_weight_constraint(lit(2), [weighted(3, 2), weighted(4, 2)], 5)
            .expect("valid constraint");

        assert!(solver.is_true(lit(1)));
        assert!(solver.is_false(lit(2)));
    }

    #[test]
    fn disjunctive_weight_constraints_are_encoded_as_clauses() {
        let mut solver = solver_with_vars(3);
        solver
            .add_weight_constraint(lit(1), [weighted(2, 3), weighted(3, 5)], 2)
            .expect("valid constraint");

        // (!x1 | x2 | x3), (x1 | !x2), (x1 | !x3)
        assert_eq!(solver.num_ternary_constraints(), 1);
        assert_eq!(solver.num_binary_constraints(), 2);
        assert_eq!(solver.num_constraints(), 3);
    }

    #[test]
    fn complementary_elements_cancel_out() {
        let mut bound = 4;
        let merged = merge_elements(
            vec![weighted(2, 3), weighted(-2, 1), weighted(3, 2), weighted(3, 1)],
            &mut bound,
        )
        .expect("no overflow");

        assert_eq!(bound, 3);
        assert_eq!(merged, vec![weighted(2, 2), weighted(3, 3)]);
    }

    #[test]
    fn general_weight_constraints_are_stored_in_the_arena() {
        let mut solver = solver_with_vars(4);
        solver
            .add_weight_constraint(lit(1), [2, 3, 4].map(|id| weighted(id, 1)), 2)
            .expect("valid constraint");
        assert_eq!(solver.num_constraints(), 1);
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(1));
        solver.assume(lit(-2));
        assert!(solver.propagate());
        assert!(solver.is_true(lit(3)));
        assert!(solver.is_true(lit(4)));
    }

    #[test]
    fn integrated_clauses_assert_their_first_literal() {
        let mut solver = solver_with_vars(5);
        solver.add_clause([lit(1), lit(5)]).expect("no conflict");
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-2));
        solver.assume(lit(-3));
        solver.assume(lit(-4));
        assert!(solver.propagate());

        let learnt = vec![lit(2), lit(3), lit(4), lit(1)];
        assert!(solver.integrate_clause(learnt, ClauseStore::Learnt(ConstraintKind::Conflict)));
        assert!(solver.is_true(lit(1)));
        assert_eq!(solver.num_learnt_constraints(), 1);
        assert_eq!(solver.statistics().constraints.learnts, 1);
        assert_eq!(solver.learnt_clauses().next().map(Clause::len), Some(4));
    }

    #[test]
    fn fully_falsified_clauses_set_a_conflict() {
        let mut solver = solver_with_vars(3);
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-1));
        solver.assume(lit(-2));
        assert!(solver.propagate());

        assert!(!solver.integrate_clause(vec![lit(1), lit(2)], ClauseStore::Native));
        assert!(solver.has_conflict());
        let mut conflict = solver.take_conflict();
        conflict.sort_unstable();
        assert_eq!(conflict, vec![lit(-1), lit(-2)]);
    }

    #[test]
    fn root_units_learnt_during_search_survive_restarts() {
        let mut solver = solver_with_vars(3);
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(2));
        assert!(solver.integrate_clause(vec![lit(3)], ClauseStore::Learnt(ConstraintKind::Loop)));
        assert!(solver.is_true(lit(3)));

        solver.undo_until(0);
        assert!(solver.is_true(lit(3)));
        assert_eq!(solver.assignments().level(Var::new(3)), 0);
    }

    #[test]
    fn conflicting_root_units_are_asserted_after_backtracking() {
        let mut solver = solver_with_vars(3);
        assert!(solver.end_add_constraints(false));

        solver.assume(lit(-3));
        assert!(!solver.integrate_clause(vec![lit(3)], ClauseStore::Native));
        assert!(solver.has_conflict());

        solver.undo_until(0);
        assert!(!solver.has_conflict());
        assert!(solver.is_true(lit(3)));
        assert_eq!(solver.assignments().level(Var::new(3)), 0);
    }
}
