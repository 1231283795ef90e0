use super::moms_score;
use super::DecayedScore;
use super::DecisionHeuristic;
use crate::engine::constraints::Clause;
use crate::engine::constraints::ConstraintKind;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::Solver;

/// The global decay counter advances once per this many decisions.
const DECAY_INTERVAL: u64 = 512;

/// The BerkMin heuristic \[1\]: decides a literal of the most recently learnt clause which is
/// not yet satisfied, picking its most active variable. If every learnt clause is satisfied the
/// most active free variable is decided; before the first conflict, the variable with the
/// highest MOMS score.
///
/// Learnt conflict clauses are inspected before loop nogoods; loop nogoods are only inspected
/// if no open conflict clause was found.
///
/// # Bibliography
/// \[1\] E. Goldberg and Y. Novikov, ‘BerkMin: A fast and robust SAT-solver’, in Design,
/// Automation and Test in Europe Conference, 2002, pp. 142–149.
#[derive(Debug)]
pub struct Berkmin {
    scores: Vec<DecayedScore>,
    /// Occurrences of the positive minus occurrences of the negative literal in learnt clauses.
    occurrences: Vec<i32>,
    decay: u32,
    decisions: u64,
    /// The maximum number of learnt clauses inspected per decision; 0 is unlimited.
    max_berkmin: u32,
    /// Whether loop nogoods are considered.
    loops: bool,
}

impl Berkmin {
    pub fn new(max_berkmin: u32, loops: bool) -> Berkmin {
        Berkmin {
            scores: vec![],
            occurrences: vec![],
            decay: 0,
            decisions: 0,
            max_berkmin,
            loops,
        }
    }

    fn grow(&mut self, num_vars: u32) {
        let len = num_vars as usize + 1;
        if self.scores.len() < len {
            self.scores.resize(len, DecayedScore::default());
            self.occurrences.resize(len, 0);
        }
    }

    fn activity(&self, var: Var) -> u32 {
        self.scores
            .get(var.id() as usize)
            .map_or(0, |score| score.value(self.decay))
    }

    fn bump(&mut self, var: Var) {
        let decay = self.decay;
        if let Some(score) = self.scores.get_mut(var.id() as usize) {
            score.bump(decay, 1);
        }
    }

    fn polarity(&self, var: Var, fallback: Literal) -> Literal {
        match self.occurrences.get(var.id() as usize).copied().unwrap_or(0) {
            o if o > 0 => Literal::positive(var),
            o if o < 0 => Literal::negative(var),
            _ => fallback,
        }
    }

    /// Scans the learnt clauses of `kind`, most recent first, for one without a true literal and
    /// returns its most active free literal.
    fn select_from_open_clause(&self, solver: &Solver, kind: ConstraintKind) -> Option<Literal> {
        let assignments = solver.assignments();
        let limit = if self.max_berkmin == 0 {
            usize::MAX
        } else {
            self.max_berkmin as usize
        };
        let open = solver
            .learnt_clauses()
            .rev()
            .filter(|clause| clause.kind() == kind)
            .take(limit)
            .find(|clause| is_open(clause, assignments))?;

        let best = open
            .literals()
            .iter()
            .filter(|literal| assignments.is_free(literal.var()))
            .max_by_key(|literal| {
                (
                    self.activity(literal.var()),
                    moms_score(solver.watch_lists(), literal.var()),
                )
            })?;
        Some(self.polarity(best.var(), *best))
    }

    fn select_most_active(&self, assignments: &Assignments) -> Option<Var> {
        assignments
            .vars()
            .filter(|&var| assignments.is_free(var))
            .max_by_key(|&var| (self.activity(var), std::cmp::Reverse(var)))
    }

    fn select_by_moms(&self, solver: &Solver) -> Option<Var> {
        let assignments = solver.assignments();
        assignments
            .vars()
            .filter(|&var| assignments.is_free(var))
            .max_by_key(|&var| (moms_score(solver.watch_lists(), var), std::cmp::Reverse(var)))
    }
}

/// Whether no literal of `clause` is true and at least one is free.
fn is_open(clause: &Clause, assignments: &Assignments) -> bool {
    let mut has_free = false;
    for &literal in clause.literals() {
        if assignments.is_true(literal) {
            return false;
        }
        has_free |= assignments.is_free(literal.var());
    }
    has_free
}

impl DecisionHeuristic for Berkmin {
    fn end_init(&mut self, solver: &Solver) {
        self.grow(solver.num_vars());
    }

    fn new_constraint(
        &mut self,
        assignments: &Assignments,
        literals: &[Literal],
        kind: ConstraintKind,
    ) {
        if kind == ConstraintKind::Static || (kind == ConstraintKind::Loop && !self.loops) {
            return;
        }
        self.grow(assignments.num_vars());
        for &literal in literals {
            self.bump(literal.var());
            self.occurrences[literal.var().id() as usize] +=
                if literal.is_positive() { 1 } else { -1 };
        }
    }

    fn update_reason(&mut self, reason: &[Literal], resolved: Option<Literal>) {
        for &literal in reason {
            self.bump(literal.var());
        }
        if let Some(resolved) = resolved {
            self.bump(resolved.var());
        }
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let assignments = solver.assignments();
        self.grow(assignments.num_vars());
        self.decisions += 1;
        if self.decisions % DECAY_INTERVAL == 0 {
            self.decay += 1;
        }

        if let Some(literal) = self.select_from_open_clause(solver, ConstraintKind::Conflict) {
            return Some(literal);
        }
        if self.loops {
            if let Some(literal) = self.select_from_open_clause(solver, ConstraintKind::Loop) {
                return Some(literal);
            }
        }

        let var = if solver.statistics().search.conflicts == 0 {
            self.select_by_moms(solver)?
        } else {
            self.select_most_active(assignments)?
        };
        Some(self.polarity(var, assignments.preferred_literal(var)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::solver::ClauseStore;
    use crate::engine::termination::Indefinite;
    use crate::engine::SearchResult;
    use crate::heuristics::testing::lit;
    use crate::heuristics::testing::solver;
    use crate::heuristics::HeuristicOptions;

    fn learn(solver: &mut Solver, literals: &[i32], kind: ConstraintKind) {
        let clause = literals.iter().map(|&id| lit(id)).collect();
        assert!(solver.integrate_clause(clause, ClauseStore::Learnt(kind)));
    }

    #[test]
    fn moms_decides_before_the_first_conflict() {
        let clauses: &[&[i32]] = &[&[1, 2], &[-1, 3], &[2, 3]];
        let solver = solver(HeuristicOptions::default(), 3, clauses);
        let mut berkmin = Berkmin::new(0, true);
        berkmin.end_init(&solver);

        // x1 is the only variable occurring in both polarities.
        assert_eq!(berkmin.select(&solver), Some(lit(-1)));
    }

    #[test]
    fn the_most_recent_open_conflict_clause_is_preferred() {
        let mut solver = solver(HeuristicOptions::default(), 8, &[]);
        learn(&mut solver, &[1, 2, 3, 4], ConstraintKind::Conflict);
        learn(&mut solver, &[-5, 6, 7, 8], ConstraintKind::Conflict);
        let mut berkmin = Berkmin::new(0, true);
        berkmin.end_init(&solver);
        berkmin.update_reason(&[lit(-6)], None);

        assert_eq!(berkmin.select(&solver), Some(lit(6)));

        // Once the newer clause is satisfied the older one is used.
        solver.assume(lit(-5));
        let choice = berkmin.select(&solver).expect("free variables are left");
        assert!((1..=4).contains(&choice.var().id()));
    }

    #[test]
    fn loop_nogoods_are_inspected_after_conflict_clauses() {
        let mut solver = solver(HeuristicOptions::default(), 8, &[]);
        learn(&mut solver, &[1, 2, 3, 4], ConstraintKind::Conflict);
        learn(&mut solver, &[-5, -6, -7, -8], ConstraintKind::Loop);
        let mut berkmin = Berkmin::new(0, true);
        berkmin.end_init(&solver);

        let choice = berkmin.select(&solver).expect("free variables are left");
        assert!(choice.var().id() <= 4);

        solver.assume(lit(1));
        let choice = berkmin.select(&solver).expect("free variables are left");
        assert!(choice.var().id() >= 5);
    }

    #[test]
    fn solves_with_berkmin() {
        let clauses: &[&[i32]] = &[
            &[1, 2, 3],
            &[-1, -2],
            &[-2, -3],
            &[-1, -3],
            &[1, 4, 5, 6],
            &[-4, -5],
            &[-6, 2],
        ];
        let mut solver = solver(HeuristicOptions::default(), 6, clauses);

        let result = solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite);
        assert_eq!(result, SearchResult::Model);
        assert!(clauses
            .iter()
            .all(|clause| clause.iter().any(|&id| solver.is_true(lit(id)))));
    }
}
