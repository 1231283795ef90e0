use super::Constraint;
use super::ConstraintKind;
use super::ConstraintRef;
use super::PropagationContext;
use super::PropagationResult;
use crate::aspen_assert_moderate;
use crate::aspen_assert_simple;
use crate::engine::assignments::Assignments;
use crate::engine::reason::Reason;
use crate::engine::variables::Literal;

/// Bookkeeping of learnt clauses, used when the learnt database is reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LearntInfo {
    pub kind: ConstraintKind,
    pub activity: u32,
}

impl LearntInfo {
    pub fn new(kind: ConstraintKind) -> LearntInfo {
        aspen_assert_simple!(kind.is_learnt());
        LearntInfo { kind, activity: 0 }
    }
}

/// A clause with more than three literals, propagated with two watched literals.
///
/// The watched literals are always at positions 0 and 1; a literal implied by the clause is moved
/// to position 0.
#[derive(Clone, Debug)]
pub struct Clause {
    literals: Vec<Literal>,
    learnt: Option<LearntInfo>,
}

impl Clause {
    pub fn new(literals: Vec<Literal>, learnt: Option<LearntInfo>) -> Clause {
        aspen_assert_simple!(literals.len() >= 2);
        Clause { literals, learnt }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn kind(&self) -> ConstraintKind {
        self.learnt
            .map_or(ConstraintKind::Static, |learnt| learnt.kind)
    }

    pub fn is_learnt(&self) -> bool {
        self.learnt.is_some()
    }

    pub fn activity(&self) -> u32 {
        self.learnt.map_or(0, |learnt| learnt.activity)
    }

    pub(crate) fn bump_activity(&mut self) {
        if let Some(learnt) = self.learnt.as_mut() {
            learnt.activity = learnt.activity.saturating_add(1);
        }
    }

    /// Halves the activity; called for every clause that survives a reduction.
    pub(crate) fn decay_activity(&mut self) {
        if let Some(learnt) = self.learnt.as_mut() {
            learnt.activity >>= 1;
        }
    }

    /// A clause is locked while it is the reason of its first literal.
    pub(crate) fn is_locked(&self, this: ConstraintRef, assignments: &Assignments) -> bool {
        let first = self.literals[0];
        assignments.is_true(first)
            && assignments.reason(first.var()) == Reason::Constraint(this)
    }

    /// The watches which have to be registered for the current first two literals.
    pub(crate) fn watched_literals(&self) -> [Literal; 2] {
        [!self.literals[0], !self.literals[1]]
    }
}

impl Constraint for Clause {
    fn propagate(
        &mut self,
        literal: Literal,
        _data: u32,
        context: &mut PropagationContext<'_>,
    ) -> PropagationResult {
        let false_literal = !literal;
        if self.literals[0] == false_literal {
            self.literals.swap(0, 1);
        }
        aspen_assert_moderate!(self.literals[1] == false_literal);

        if context.is_true(self.literals[0]) {
            return PropagationResult::keep(true);
        }

        for index in 2..self.literals.len() {
            if !context.is_false(self.literals[index]) {
                self.literals.swap(1, index);
                context.add_watch(!self.literals[1], 0);
                return PropagationResult::drop_watch(true);
            }
        }

        PropagationResult::keep(context.force(self.literals[0]))
    }

    fn reason(&self, literal: Literal, _assignments: &Assignments, reason: &mut Vec<Literal>) {
        aspen_assert_moderate!(self.literals[0] == literal);
        reason.extend(self.literals[1..].iter().map(|&other| !other));
    }

    fn simplify(&mut self, assignments: &Assignments) -> bool {
        if self
            .literals
            .iter()
            .any(|&literal| assignments.is_true(literal))
        {
            return true;
        }

        // The watched literals are never false here: the clause would be satisfied or unit.
        let mut kept = 2;
        for index in 2..self.literals.len() {
            if !assignments.is_false(self.literals[index]) {
                self.literals.swap(kept, index);
                kept += 1;
            }
        }
        self.literals.truncate(kept);
        false
    }
}
