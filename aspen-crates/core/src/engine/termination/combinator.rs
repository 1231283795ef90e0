use super::TerminationCondition;

/// Stops as soon as either of two conditions does.
#[derive(Clone, Copy, Debug)]
pub struct Combinator<First, Second> {
    first: First,
    second: Second,
}

impl<First, Second> Combinator<First, Second> {
    pub fn new(first: First, second: Second) -> Self {
        Combinator { first, second }
    }
}

impl<First: TerminationCondition, Second: TerminationCondition> TerminationCondition
    for Combinator<First, Second>
{
    fn should_stop(&mut self) -> bool {
        self.first.should_stop() || self.second.should_stop()
    }

    fn decision_has_been_made(&mut self) {
        self.first.decision_has_been_made();
        self.second.decision_has_been_made();
    }

    fn conflict_has_been_detected(&mut self) {
        self.first.conflict_has_been_detected();
        self.second.conflict_has_been_detected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::ConflictBudget;
    use crate::engine::termination::DecisionBudget;

    #[test]
    fn stops_when_either_budget_is_spent() {
        let mut condition = Combinator::new(DecisionBudget::new(3), ConflictBudget::new(1));
        assert!(!condition.should_stop());

        condition.decision_has_been_made();
        assert!(!condition.should_stop());

        condition.conflict_has_been_detected();
        assert!(condition.should_stop());
    }
}
