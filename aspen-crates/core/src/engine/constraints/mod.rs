//! Constraints stored in the [`ConstraintArena`] and the context through which they interact with
//! the solver during propagation.
//!
//! Short clauses (binary and ternary) are not stored here; they live directly in the watch lists.
mod arena;
mod clause;
mod minimize_constraint;
mod unfounded_check;
mod weight_constraint;

pub use arena::ConstraintRef;
pub(crate) use arena::ConstraintArena;
pub use clause::Clause;
pub use clause::LearntInfo;
pub use minimize_constraint::MinimizeConstraint;
pub use minimize_constraint::MinimizeMode;
pub(crate) use unfounded_check::LoopNogood;
pub use unfounded_check::UfsBody;
pub use unfounded_check::UnfoundedCheck;
pub use weight_constraint::WeightConstraint;

use enum_map::Enum;

use super::assignments::Assignments;
use super::reason::Reason;
use super::variables::Literal;
use super::variables::Value;
use super::watch_lists::Watch;
use super::watch_lists::WatchLists;

/// The origin of a constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum)]
pub enum ConstraintKind {
    /// Part of the problem.
    Static,
    /// Learnt from a conflict.
    Conflict,
    /// A loop nogood produced by the unfounded-set check.
    Loop,
}

impl ConstraintKind {
    pub fn is_learnt(self) -> bool {
        self != ConstraintKind::Static
    }
}

/// Outcome of [`Constraint::propagate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagationResult {
    /// `false` if a conflict was detected.
    pub ok: bool,
    /// Whether the watch which triggered the propagation stays in its list.
    pub keep_watch: bool,
}

impl PropagationResult {
    pub const fn keep(ok: bool) -> PropagationResult {
        PropagationResult {
            ok,
            keep_watch: true,
        }
    }

    pub const fn drop_watch(ok: bool) -> PropagationResult {
        PropagationResult {
            ok,
            keep_watch: false,
        }
    }
}

/// A failed force: `literal` could not be made true because it was already false.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ConflictInfo {
    pub(crate) literal: Literal,
    pub(crate) reason: Reason,
}

/// For every decision level, the constraints which asked to be notified when that level is undone.
#[derive(Clone, Debug, Default)]
pub(crate) struct UndoLists {
    levels: Vec<Vec<ConstraintRef>>,
}

impl UndoLists {
    pub(crate) fn register(&mut self, level: u32, constraint: ConstraintRef) {
        let level = level as usize;
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, Vec::new);
        }
        self.levels[level].push(constraint);
    }

    pub(crate) fn take_level(&mut self, level: u32) -> Vec<ConstraintRef> {
        self.levels
            .get_mut(level as usize)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

/// Makes `literal` true with the given reason, recording a conflict if it is false already.
pub(crate) fn force_literal(
    assignments: &mut Assignments,
    conflict: &mut Option<ConflictInfo>,
    literal: Literal,
    reason: Reason,
) -> bool {
    match assignments.literal_value(literal) {
        Value::True => true,
        Value::Free => {
            assignments.assign(literal, reason);
            true
        }
        Value::False => {
            *conflict = Some(ConflictInfo { literal, reason });
            false
        }
    }
}

/// The view a constraint has on the solver while it propagates.
#[derive(Debug)]
pub struct PropagationContext<'a> {
    pub(crate) assignments: &'a mut Assignments,
    pub(crate) watch_lists: &'a mut WatchLists,
    pub(crate) undo_lists: &'a mut UndoLists,
    pub(crate) conflict: &'a mut Option<ConflictInfo>,
    pub(crate) constraint: ConstraintRef,
}

impl PropagationContext<'_> {
    pub fn assignments(&self) -> &Assignments {
        self.assignments
    }

    pub fn value(&self, literal: Literal) -> Value {
        self.assignments.literal_value(literal)
    }

    pub fn is_true(&self, literal: Literal) -> bool {
        self.assignments.is_true(literal)
    }

    pub fn is_false(&self, literal: Literal) -> bool {
        self.assignments.is_false(literal)
    }

    pub fn decision_level(&self) -> u32 {
        self.assignments.decision_level()
    }

    /// The reference of the constraint that is propagating.
    pub fn constraint(&self) -> ConstraintRef {
        self.constraint
    }

    /// Forces `literal` with the propagating constraint as its reason.
    pub fn force(&mut self, literal: Literal) -> bool {
        let reason = Reason::Constraint(self.constraint);
        force_literal(self.assignments, self.conflict, literal, reason)
    }

    /// Adds a watch for the propagating constraint; it fires once `literal` becomes true.
    pub fn add_watch(&mut self, literal: Literal, data: u32) {
        self.watch_lists.add_watch(
            literal,
            Watch {
                constraint: self.constraint,
                data,
            },
        );
    }

    /// Requests a call to [`Constraint::undo_level`] once the current decision level is undone.
    pub fn register_undo(&mut self) {
        let level = self.assignments.decision_level();
        if level > 0 {
            self.undo_lists.register(level, self.constraint);
        }
    }
}

/// The interface every constraint stored in the [`ConstraintArena`] implements.
pub trait Constraint {
    /// Called when `literal`, which the constraint watches, became true. `data` is the value
    /// stored with the watch.
    fn propagate(
        &mut self,
        literal: Literal,
        data: u32,
        context: &mut PropagationContext<'_>,
    ) -> PropagationResult;

    /// Appends the true literals which implied `literal` to `reason`.
    fn reason(&self, literal: Literal, assignments: &Assignments, reason: &mut Vec<Literal>);

    /// Called, before the literals of `level` are freed, for constraints which registered
    /// themselves on that level.
    fn undo_level(&mut self, _level: u32, _assignments: &Assignments) {}

    /// Simplifies the constraint with respect to the root-level assignment; returns `true` if it
    /// became redundant and can be removed.
    fn simplify(&mut self, _assignments: &Assignments) -> bool {
        false
    }
}

/// Every kind of constraint the arena can hold.
#[derive(Clone, Debug)]
pub enum StoredConstraint {
    Clause(Clause),
    Weight(WeightConstraint),
    Minimize(MinimizeConstraint),
    Unfounded(UnfoundedCheck),
}

impl StoredConstraint {
    pub fn as_clause(&self) -> Option<&Clause> {
        match self {
            StoredConstraint::Clause(clause) => Some(clause),
            _ => None,
        }
    }

    pub(crate) fn as_clause_mut(&mut self) -> Option<&mut Clause> {
        match self {
            StoredConstraint::Clause(clause) => Some(clause),
            _ => None,
        }
    }

    pub(crate) fn as_minimize(&self) -> Option<&MinimizeConstraint> {
        match self {
            StoredConstraint::Minimize(minimize) => Some(minimize),
            _ => None,
        }
    }

    pub(crate) fn as_minimize_mut(&mut self) -> Option<&mut MinimizeConstraint> {
        match self {
            StoredConstraint::Minimize(minimize) => Some(minimize),
            _ => None,
        }
    }

    pub(crate) fn as_unfounded_mut(&mut self) -> Option<&mut UnfoundedCheck> {
        match self {
            StoredConstraint::Unfounded(check) => Some(check),
            _ => None,
        }
    }
}

impl Constraint for StoredConstraint {
    fn propagate(
        &mut self,
        literal: Literal,
        data: u32,
        context: &mut PropagationContext<'_>,
    ) -> PropagationResult {
        match self {
            StoredConstraint::Clause(clause) => clause.propagate(literal, data, context),
            StoredConstraint::Weight(weight) => weight.propagate(literal, data, context),
            StoredConstraint::Minimize(minimize) => minimize.propagate(literal, data, context),
            StoredConstraint::Unfounded(check) => check.propagate(literal, data, context),
        }
    }

    fn reason(&self, literal: Literal, assignments: &Assignments, reason: &mut Vec<Literal>) {
        match self {
            StoredConstraint::Clause(clause) => clause.reason(literal, assignments, reason),
            StoredConstraint::Weight(weight) => weight.reason(literal, assignments, reason),
            StoredConstraint::Minimize(minimize) => minimize.reason(literal, assignments, reason),
            StoredConstraint::Unfounded(check) => check.reason(literal, assignments, reason),
        }
    }

    fn undo_level(&mut self, level: u32, assignments: &Assignments) {
        match self {
            StoredConstraint::Clause(clause) => clause.undo_level(level, assignments),
            StoredConstraint::Weight(weight) => weight.undo_level(level, assignments),
            StoredConstraint::Minimize(minimize) => minimize.undo_level(level, assignments),
            StoredConstraint::Unfounded(check) => check.undo_level(level, assignments),
        }
    }

    fn simplify(&mut self, assignments: &Assignments) -> bool {
        match self {
            StoredConstraint::Clause(clause) => clause.simplify(assignments),
            StoredConstraint::Weight(weight) => weight.simplify(assignments),
            StoredConstraint::Minimize(minimize) => minimize.simplify(assignments),
            StoredConstraint::Unfounded(check) => check.simplify(assignments),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::engine::variables::VarKind;

    /// The pieces of solver state a constraint touches, for testing constraints in isolation.
    #[derive(Debug)]
    pub(crate) struct ConstraintFixture {
        pub(crate) assignments: Assignments,
        pub(crate) watch_lists: WatchLists,
        pub(crate) undo_lists: UndoLists,
        pub(crate) conflict: Option<ConflictInfo>,
        pub(crate) arena: ConstraintArena,
    }

    impl ConstraintFixture {
        pub(crate) fn new(num_vars: u32) -> ConstraintFixture {
            let mut assignments = Assignments::default();
            for _ in 0..num_vars {
                let _ = assignments.new_var(VarKind::Atom);
            }
            let mut watch_lists = WatchLists::default();
            watch_lists.grow(assignments.num_vars() + 1);
            ConstraintFixture {
                assignments,
                watch_lists,
                undo_lists: UndoLists::default(),
                conflict: None,
                arena: ConstraintArena::default(),
            }
        }

        pub(crate) fn propagate(
            &mut self,
            constraint: ConstraintRef,
            literal: Literal,
            data: u32,
        ) -> PropagationResult {
            let mut context = PropagationContext {
                assignments: &mut self.assignments,
                watch_lists: &mut self.watch_lists,
                undo_lists: &mut self.undo_lists,
                conflict: &mut self.conflict,
                constraint,
            };
            let stored = self
                .arena
                .get_mut(constraint)
                .expect("the constraint is in the arena");
            stored.propagate(literal, data, &mut context)
        }

        /// Assigns `literal` as a decision and propagates it to every general watch of the
        /// literal, like the solver would.
        pub(crate) fn assign_and_propagate(&mut self, literal: Literal) -> bool {
            self.assignments.assign(literal, Reason::Decision);
            let watches = self.watch_lists.list(literal).general.clone();
            watches
                .into_iter()
                .all(|watch| self.propagate(watch.constraint, literal, watch.data).ok)
        }

        pub(crate) fn new_level(&mut self) {
            self.assignments.new_decision_level();
        }

        pub(crate) fn undo_level(&mut self) {
            let level = self.assignments.decision_level();
            for constraint in self.undo_lists.take_level(level) {
                if let Some(stored) = self.arena.get_mut(constraint) {
                    stored.undo_level(level, &self.assignments);
                }
            }
            self.assignments.undo_level(false);
            self.conflict = None;
        }

        pub(crate) fn reason(&self, constraint: ConstraintRef, literal: Literal) -> Vec<Literal> {
            let mut reason = vec![];
            self.arena
                .get(constraint)
                .expect("the constraint is in the arena")
                .reason(literal, &self.assignments, &mut reason);
            reason.sort_by_key(|literal| literal.code());
            reason
        }
    }
}
