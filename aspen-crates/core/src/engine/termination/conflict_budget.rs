use super::TerminationCondition;

/// Stops once the given number of conflicts has been encountered.
#[derive(Clone, Copy, Debug)]
pub struct ConflictBudget {
    remaining: u64,
}

impl ConflictBudget {
    pub fn new(budget: u64) -> Self {
        ConflictBudget { remaining: budget }
    }
}

impl TerminationCondition for ConflictBudget {
    fn should_stop(&mut self) -> bool {
        self.remaining == 0
    }

    fn conflict_has_been_detected(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}
