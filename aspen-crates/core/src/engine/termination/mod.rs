//! Conditions which are polled during search and can interrupt it before a definitive answer is
//! found, in which case solving ends with an unknown outcome.
//!
//! The solver polls the condition once per conflict and once per decision.

pub(crate) mod combinator;
pub(crate) mod conflict_budget;
pub(crate) mod decision_budget;
pub(crate) mod indefinite;
pub(crate) mod time_budget;

pub use combinator::Combinator;
pub use conflict_budget::ConflictBudget;
pub use decision_budget::DecisionBudget;
pub use indefinite::Indefinite;
pub use time_budget::TimeBudget;

/// Decides when the solver should give up.
pub trait TerminationCondition {
    /// Returns `true` when the search should stop.
    fn should_stop(&mut self) -> bool;

    fn decision_has_been_made(&mut self) {}

    fn conflict_has_been_detected(&mut self) {}
}

impl<T: TerminationCondition> TerminationCondition for Option<T> {
    fn should_stop(&mut self) -> bool {
        self.as_mut().is_some_and(|condition| condition.should_stop())
    }

    fn decision_has_been_made(&mut self) {
        if let Some(condition) = self {
            condition.decision_has_been_made();
        }
    }

    fn conflict_has_been_detected(&mut self) {
        if let Some(condition) = self {
            condition.conflict_has_been_detected();
        }
    }
}

impl<T: TerminationCondition + ?Sized> TerminationCondition for &mut T {
    fn should_stop(&mut self) -> bool {
        (**self).should_stop()
    }

    fn decision_has_been_made(&mut self) {
        (**self).decision_has_been_made();
    }

    fn conflict_has_been_detected(&mut self) {
        (**self).conflict_has_been_detected();
    }
}
