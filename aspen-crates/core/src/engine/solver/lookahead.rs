//! Failed-literal detection: literals are assumed tentatively and propagated; a literal whose
//! propagation fails is a failed literal and its complement holds.
use enumset::EnumSet;

use super::Solver;
use crate::containers::HashSet;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::variables::VarKind;
use crate::engine::variables::VarRole;
use crate::heuristics::LookaheadKind;

const MAX_SCORE: u32 = (1 << 14) - 1;

/// The result of probing both literals of a variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct VarScore {
    positive: u32,
    negative: u32,
    seen_positive: bool,
    seen_negative: bool,
    tested_positive: bool,
    tested_negative: bool,
}

impl VarScore {
    pub(crate) fn clear(&mut self) {
        *self = VarScore::default();
    }

    /// Records that `literal` was probed and derived `score` literals.
    pub(crate) fn set_score(&mut self, literal: Literal, score: u32) {
        let score = score.min(MAX_SCORE);
        if literal.is_positive() {
            self.positive = score;
            self.tested_positive = true;
        } else {
            self.negative = score;
            self.tested_negative = true;
        }
    }

    pub(crate) fn score(&self, literal: Literal) -> u32 {
        if literal.is_positive() {
            self.positive
        } else {
            self.negative
        }
    }

    /// Records that `literal` was derived by some probe.
    pub(crate) fn set_seen(&mut self, literal: Literal) {
        if literal.is_positive() {
            self.seen_positive = true;
        } else {
            self.seen_negative = true;
        }
    }

    pub(crate) fn is_seen(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.seen_positive
        } else {
            self.seen_negative
        }
    }

    pub(crate) fn is_tested(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.tested_positive
        } else {
            self.tested_negative
        }
    }

    pub(crate) fn is_any_tested(&self) -> bool {
        self.tested_positive || self.tested_negative
    }

    /// The smaller and the larger score of the two literals.
    pub(crate) fn min_max(&self) -> (u32, u32) {
        (
            self.positive.min(self.negative),
            self.positive.max(self.negative),
        )
    }
}

/// The state of failed-literal detection that is kept between calls: which literals were derived
/// by earlier probes, and where the next call continues.
#[derive(Clone, Debug, Default)]
pub struct LookaheadState {
    kind: LookaheadKind,
    scores: Vec<VarScore>,
    /// Variables whose score was touched since the last failure.
    deps: Vec<Var>,
    cursor: u32,
}

impl LookaheadState {
    pub fn new(kind: LookaheadKind) -> LookaheadState {
        LookaheadState {
            kind,
            ..LookaheadState::default()
        }
    }

    /// The state used for failed-literal detection after constraints were added: atoms are
    /// probed in both polarities.
    pub fn for_preprocessing() -> LookaheadState {
        LookaheadState::new(LookaheadKind::Atom)
    }

    pub fn kind(&self) -> LookaheadKind {
        self.kind
    }

    /// Forgets all scores; the cursor is kept.
    pub(crate) fn reset(&mut self) {
        self.clear_touched();
    }

    pub(crate) fn score(&self, var: Var) -> VarScore {
        self.scores
            .get(var.id() as usize)
            .copied()
            .unwrap_or_default()
    }

    /// The variables which were probed or derived since the last reset.
    pub(crate) fn touched_vars(&self) -> &[Var] {
        &self.deps
    }

    fn roles(&self) -> EnumSet<VarRole> {
        match self.kind {
            LookaheadKind::Atom => VarRole::Atom.into(),
            LookaheadKind::Body => VarRole::Body.into(),
            LookaheadKind::Hybrid => VarRole::Atom | VarRole::Body,
        }
    }

    /// Hybrid lookahead only probes the preferred literal of variables which are not both atom
    /// and body.
    fn is_uniform(&self) -> bool {
        self.kind != LookaheadKind::Hybrid
    }

    /// The score of `var`, which is registered as touched if it was clear.
    fn score_mut(&mut self, var: Var) -> &mut VarScore {
        let index = var.id() as usize;
        if self.scores.len() <= index {
            self.scores.resize(index + 1, VarScore::default());
        }
        if self.scores[index] == VarScore::default() {
            self.deps.push(var);
        }
        &mut self.scores[index]
    }

    /// Clears the scores of every touched variable.
    fn clear_touched(&mut self) {
        for var in std::mem::take(&mut self.deps) {
            self.scores[var.id() as usize].clear();
        }
    }
}

impl Solver {
    /// Probes the free variables matching the kind of `state`, starting at its cursor, until a
    /// failed literal is found or every variable was probed. Returns `true` if a failed literal
    /// was found; its complement is then asserted (or a conflict is pending).
    pub(crate) fn failed_literal(&mut self, state: &mut LookaheadState) -> bool {
        let num_vars = self.num_vars();
        if num_vars == 0 {
            return false;
        }
        let roles = state.roles();
        let uniform = state.is_uniform();
        let start = if state.cursor == 0 || state.cursor > num_vars {
            1
        } else {
            state.cursor
        };

        let mut current = start;
        let mut failed = false;
        loop {
            let var = Var::new(current);
            let kind = self.assignments.kind(var);
            if kind.matches(roles) && self.assignments.is_free(var) {
                let preferred = kind.preferred_literal(var);
                let test_both = uniform || kind == VarKind::AtomBody;
                if !state.score(var).is_seen(preferred) && !self.lookahead(preferred, state) {
                    failed = true;
                } else if test_both
                    && self.assignments.is_free(var)
                    && !state.score(var).is_seen(!preferred)
                    && !self.lookahead(!preferred, state)
                {
                    failed = true;
                }
                if failed {
                    state.clear_touched();
                    break;
                }
            }
            current = if current == num_vars { 1 } else { current + 1 };
            if current == start {
                break;
            }
        }
        state.cursor = current;
        failed
    }

    /// Assumes `literal` and propagates it. On success the number of derived literals is stored
    /// as the score of `literal` and the assumption is undone; on failure the conflict is
    /// resolved. Probes do not count as choices.
    fn lookahead(&mut self, literal: Literal, state: &mut LookaheadState) -> bool {
        let old_len = self.assignments.trail().len();
        self.assume(literal);
        let ok = self.propagate();
        if ok {
            let derived = (self.assignments.trail().len() - old_len) as u32;
            state.score_mut(literal.var()).set_score(literal, derived);
            let roles = state.roles();
            for index in old_len..self.assignments.trail().len() {
                let implied = self.assignments.trail()[index];
                if !self.assignments.kind(implied.var()).matches(roles) {
                    continue;
                }
                state.score_mut(implied.var()).set_seen(implied);
            }
            self.undo_until(self.decision_level() - 1);
        } else {
            let _ = self.resolve_conflict();
        }
        self.statistics.search.choices -= 1;
        ok
    }

    /// Estimates the number of literals `literal` would derive through binary clauses, following
    /// implications up to `depth` steps (unbounded if `None`). Nothing is assigned.
    pub fn estimate_bcp(&self, literal: Literal, depth: Option<u32>) -> u32 {
        if !self.assignments.is_free(literal.var()) {
            return 0;
        }
        let mut reached = vec![literal];
        let mut visited: HashSet<Var> = HashSet::default();
        let _ = visited.insert(literal.var());

        let mut remaining = depth;
        let mut next = 0;
        let mut level_end = reached.len();
        while next < reached.len() {
            if next == level_end {
                match remaining {
                    Some(0) => break,
                    Some(steps) => remaining = Some(steps - 1),
                    None => {}
                }
                level_end = reached.len();
            }
            let current = reached[next];
            next += 1;
            for &implied in self.watch_lists.binary_implications(current) {
                if self.assignments.is_free(implied.var()) && visited.insert(implied.var()) {
                    reached.push(implied);
                }
            }
        }
        reached.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::VarKind;

    fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    fn solver(num_vars: u32, clauses: &[&[i32]]) -> Solver {
        let mut solver = Solver::default();
        for _ in 0..num_vars {
            let _ = solver.add_var(VarKind::Atom);
        }
        solver.start_add_constraints();
        for clause in clauses {
            solver
                .add_clause(clause.iter().map(|&id| lit(id)))
                .expect("no root conflict");
        }
        solver
    }

    #[test]
    fn failed_literals_are_detected_on_the_root() {
        // x1 implies both x2 and ~x2, so ~x1 holds.
        let mut solver = solver(3, &[&[-1, 2], &[-1, -2], &[1, 3, -2]]);
        assert!(solver.end_add_constraints(true));

        assert!(solver.is_false(lit(1)));
        assert_eq!(solver.decision_level(), 0);
        assert_eq!(solver.statistics().search.choices, 0);
    }

    #[test]
    fn probing_without_failures_changes_nothing() {
        let mut solver = solver(3, &[&[1, 2], &[-2, 3]]);
        assert!(solver.end_add_constraints(false));

        let mut state = LookaheadState::for_preprocessing();
        assert!(!solver.failed_literal(&mut state));
        assert_eq!(solver.num_assigned_vars(), 0);
        assert_eq!(solver.decision_level(), 0);

        // ~x1 derives x2 and x3, so x2 and x3 are not probed themselves.
        assert_eq!(state.score(Var::new(1)).score(lit(-1)), 3);
        assert!(state.score(Var::new(2)).is_seen(lit(2)));
        assert!(!state.score(Var::new(2)).is_tested(lit(2)));
        assert_eq!(state.score(Var::new(2)).score(lit(-2)), 2);
        assert!(state.score(Var::new(3)).is_seen(lit(3)));
    }

    #[test]
    fn infeasible_problems_are_found_by_probing() {
        let mut solver = solver(2, &[&[1, 2], &[1, -2], &[-1, 2], &[-1, -2]]);
        assert!(!solver.end_add_constraints(true));
        assert!(solver.is_infeasible());
    }

    #[test]
    fn binary_implications_are_estimated() {
        let mut solver = solver(4, &[&[-1, 2], &[-2, 3], &[-3, 4]]);
        assert!(solver.end_add_constraints(false));

        assert_eq!(solver.estimate_bcp(lit(1), None), 4);
        assert_eq!(solver.estimate_bcp(lit(1), Some(1)), 3);
        assert_eq!(solver.estimate_bcp(lit(1), Some(0)), 2);
        assert_eq!(solver.estimate_bcp(lit(-4), None), 4);
    }
}
