use super::first_free_var;
use super::DecisionHeuristic;
use super::Heuristic;
use super::LookaheadKind;
use crate::engine::constraints::ConstraintKind;
use crate::engine::solver::VarScore;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::LookaheadState;
use crate::engine::Solver;

/// Failed-literal detection before every decision. The solver takes the [`LookaheadState`] out
/// of this heuristic, probes the free variables, and puts it back; if no literal failed, the
/// decision is either left to the wrapped heuristic or made from the scores of the probes.
///
/// Without a wrapped heuristic the variable whose literals derived the most consequences is
/// decided.
#[derive(Debug)]
pub struct Lookahead {
    state: Option<LookaheadState>,
    inner: Option<Box<Heuristic>>,
    /// The number of decisions left before probing stops.
    budget: Option<u64>,
}

impl Lookahead {
    pub fn new(kind: LookaheadKind, inner: Option<Box<Heuristic>>, budget: Option<u64>) -> Self {
        Lookahead {
            state: Some(LookaheadState::new(kind)),
            inner,
            budget,
        }
    }

    pub(crate) fn take_state(&mut self) -> Option<LookaheadState> {
        if self.is_exhausted() {
            return None;
        }
        self.state.take()
    }

    pub(crate) fn restore_state(&mut self, state: LookaheadState) {
        self.state = Some(state);
    }

    fn is_exhausted(&self) -> bool {
        self.budget == Some(0)
    }

    /// The literal of the best probed variable, if any free variable was probed.
    fn select_by_score(&self, assignments: &Assignments) -> Option<Literal> {
        let state = self.state.as_ref()?;
        let candidates = state
            .touched_vars()
            .iter()
            .copied()
            .filter(|&var| assignments.is_free(var))
            .map(|var| (var, state.score(var)))
            .filter(|(_, score)| score.is_any_tested());

        if state.kind() == LookaheadKind::Hybrid {
            candidates
                .map(|(var, score)| {
                    let literal = tested_literal(assignments, var, &score);
                    (score.score(literal), literal)
                })
                .max_by_key(|&(score, literal)| (score, std::cmp::Reverse(literal.var())))
                .map(|(_, literal)| literal)
        } else {
            candidates
                .max_by_key(|&(var, score)| (score.min_max(), std::cmp::Reverse(var)))
                .map(|(var, score)| {
                    let preferred = assignments.preferred_literal(var);
                    if score.score(!preferred) > score.score(preferred) {
                        !preferred
                    } else {
                        preferred
                    }
                })
        }
    }
}

fn tested_literal(assignments: &Assignments, var: Var, score: &VarScore) -> Literal {
    let preferred = assignments.preferred_literal(var);
    if score.is_tested(preferred) {
        preferred
    } else {
        !preferred
    }
}

impl DecisionHeuristic for Lookahead {
    fn start_init(&mut self, assignments: &Assignments) {
        if let Some(inner) = self.inner.as_mut() {
            inner.start_init(assignments);
        }
    }

    fn end_init(&mut self, solver: &Solver) {
        if let Some(inner) = self.inner.as_mut() {
            inner.end_init(solver);
        }
    }

    fn new_constraint(
        &mut self,
        assignments: &Assignments,
        literals: &[Literal],
        kind: ConstraintKind,
    ) {
        if let Some(inner) = self.inner.as_mut() {
            inner.new_constraint(assignments, literals, kind);
        }
    }

    fn update_reason(&mut self, reason: &[Literal], resolved: Option<Literal>) {
        if let Some(inner) = self.inner.as_mut() {
            inner.update_reason(reason, resolved);
        }
    }

    fn undo_until(&mut self, assignments: &Assignments, start: usize) {
        if let Some(inner) = self.inner.as_mut() {
            inner.undo_until(assignments, start);
        }
    }

    fn simplify(&mut self, assignments: &Assignments, start: usize) {
        if let Some(inner) = self.inner.as_mut() {
            inner.simplify(assignments, start);
        }
    }

    fn resurrect(&mut self, var: Var) {
        if let Some(inner) = self.inner.as_mut() {
            inner.resurrect(var);
        }
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let probed = !self.is_exhausted();
        if let Some(budget) = self.budget.as_mut() {
            *budget = budget.saturating_sub(1);
        }

        if let Some(inner) = self.inner.as_mut() {
            return inner.select(solver);
        }
        let assignments = solver.assignments();
        if probed {
            if let Some(literal) = self.select_by_score(assignments) {
                return Some(literal);
            }
        }
        first_free_var(assignments).map(|var| assignments.preferred_literal(var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::Indefinite;
    use crate::engine::SearchResult;
    use crate::heuristics::testing::lit;
    use crate::heuristics::testing::solver;
    use crate::heuristics::HeuristicKind;
    use crate::heuristics::HeuristicOptions;
    use crate::heuristics::SelectFirst;

    fn lookahead_options(kind: HeuristicKind) -> HeuristicOptions {
        HeuristicOptions {
            kind,
            lookahead: Some(LookaheadKind::Atom),
            ..HeuristicOptions::default()
        }
    }

    #[test]
    fn the_variable_with_the_most_consequences_is_decided() {
        let mut solver = solver(
            lookahead_options(HeuristicKind::Lookahead),
            5,
            &[&[1, 2], &[1, 3], &[1, 4], &[4, 5]],
        );
        let mut lookahead = Lookahead::new(LookaheadKind::Atom, None, None);
        let mut state = lookahead.take_state().expect("probing is enabled");
        assert!(!solver.failed_literal(&mut state));
        lookahead.restore_state(state);

        // ~x1 derives x2, x3, x4; the other literals derive at most one literal.
        let choice = lookahead.select(&solver).expect("free variables are left");
        assert_eq!(choice.var(), Var::new(1));
    }

    #[test]
    fn the_budget_switches_probing_off() {
        let solver = solver(lookahead_options(HeuristicKind::Lookahead), 2, &[]);
        let mut lookahead = Lookahead::new(LookaheadKind::Atom, None, Some(1));

        let state = lookahead.take_state().expect("the budget is not exhausted");
        lookahead.restore_state(state);
        let _ = lookahead.select(&solver);

        assert!(lookahead.take_state().is_none());
        assert_eq!(lookahead.select(&solver), Some(lit(-1)));
    }

    #[test]
    fn decisions_are_left_to_the_wrapped_heuristic() {
        let solver = solver(lookahead_options(HeuristicKind::First), 3, &[&[3, 2]]);
        let mut lookahead = Lookahead::new(
            LookaheadKind::Atom,
            Some(Box::new(Heuristic::First(SelectFirst))),
            None,
        );

        assert_eq!(lookahead.select(&solver), Some(lit(-1)));
    }

    #[test]
    fn probing_before_decisions_solves() {
        for kind in [HeuristicKind::Lookahead, HeuristicKind::Berkmin] {
            let clauses: &[&[i32]] = &[&[1, 2], &[-1, 3], &[-2, -3], &[2, 3], &[-3, 4, -1]];
            let mut solver = solver(lookahead_options(kind), 4, clauses);

            let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite);
            assert_eq!(result, SearchResult::Model);
            assert!(clauses
                .iter()
                .all(|clause| clause.iter().any(|&id| solver.is_true(lit(id)))));
        }
    }
}
