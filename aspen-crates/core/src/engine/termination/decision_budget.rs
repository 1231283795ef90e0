use super::TerminationCondition;

/// Stops once the given number of decisions has been made.
#[derive(Clone, Copy, Debug)]
pub struct DecisionBudget {
    remaining: u64,
}

impl DecisionBudget {
    pub fn new(budget: u64) -> Self {
        DecisionBudget { remaining: budget }
    }
}

impl TerminationCondition for DecisionBudget {
    fn should_stop(&mut self) -> bool {
        self.remaining == 0
    }

    fn decision_has_been_made(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}
