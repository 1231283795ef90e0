use super::first_free_var;
use super::DecisionHeuristic;
use crate::engine::variables::Literal;
use crate::engine::Solver;

/// Decides the first free variable in index order, using the preferred literal of its kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectFirst;

impl DecisionHeuristic for SelectFirst {
    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let assignments = solver.assignments();
        first_free_var(assignments).map(|var| assignments.preferred_literal(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::testing::lit;
    use crate::heuristics::testing::solver;
    use crate::heuristics::HeuristicKind;
    use crate::heuristics::HeuristicOptions;

    #[test]
    fn the_first_free_variable_is_chosen() {
        let options = HeuristicOptions {
            kind: HeuristicKind::First,
            ..HeuristicOptions::default()
        };
        let mut solver = solver(options, 3, &[&[1, 2, 3]]);
        solver.assume(lit(-1));

        assert_eq!(SelectFirst.select(&solver), Some(lit(-2)));
    }
}
