use super::DecisionHeuristic;
use crate::containers::KeyValueHeap;
use crate::containers::StorageKey;
use crate::engine::constraints::ConstraintKind;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::Solver;

const DEFAULT_VSIDS_INCREMENT: f64 = 1.0;
const DEFAULT_VSIDS_MAX_THRESHOLD: f64 = 1e100;
const DEFAULT_VSIDS_DECAY_FACTOR: f64 = 0.95;

/// Variable State Independent Decaying Sum: decides the free variable with the highest
/// activity, where the activity of a variable is bumped whenever it occurs in a learnt clause
/// and older bumps count less than recent ones.
///
/// The polarity is the one the variable has most often in learnt clauses; on a tie the
/// preferred literal of its kind is used.
#[derive(Debug)]
pub struct Vsids {
    heap: KeyValueHeap<Var, f64>,
    /// Occurrences of the positive minus occurrences of the negative literal in learnt clauses.
    occurrences: Vec<i32>,
    increment: f64,
    /// Whether loop nogoods bump activities as well.
    loops: bool,
}

impl Vsids {
    pub fn new(loops: bool) -> Vsids {
        Vsids {
            heap: KeyValueHeap::default(),
            occurrences: vec![],
            increment: DEFAULT_VSIDS_INCREMENT,
            loops,
        }
    }

    /// Adds the variables up to `num_vars` to the heap.
    fn grow(&mut self, num_vars: u32) {
        while self.heap.len() <= num_vars as usize {
            let var = Var::create_from_index(self.heap.len());
            self.heap.grow(var, 0.0);
            if var.is_sentinel() {
                self.heap.delete_key(var);
            }
        }
        self.occurrences.resize(num_vars as usize + 1, 0);
    }

    fn bump_activity(&mut self, var: Var) {
        if var.index() >= self.heap.len() {
            return;
        }
        let activity = self.heap.get_value(var);
        if activity + self.increment >= DEFAULT_VSIDS_MAX_THRESHOLD {
            self.heap.divide_values(DEFAULT_VSIDS_MAX_THRESHOLD);
            self.increment /= DEFAULT_VSIDS_MAX_THRESHOLD;
        }
        self.heap.increment(var, self.increment);
    }

    fn decay_activities(&mut self) {
        self.increment *= 1.0 / DEFAULT_VSIDS_DECAY_FACTOR;
    }

    pub fn activity(&self, var: Var) -> f64 {
        if var.index() < self.heap.len() {
            self.heap.get_value(var)
        } else {
            0.0
        }
    }
}

impl DecisionHeuristic for Vsids {
    fn end_init(&mut self, solver: &Solver) {
        self.grow(solver.num_vars());
        for var in solver.assignments().vars() {
            if !solver.assignments().is_free(var) {
                self.heap.delete_key(var);
            }
        }
    }

    fn new_constraint(
        &mut self,
        _assignments: &Assignments,
        literals: &[Literal],
        kind: ConstraintKind,
    ) {
        if kind == ConstraintKind::Static || (kind == ConstraintKind::Loop && !self.loops) {
            return;
        }
        for &literal in literals {
            self.bump_activity(literal.var());
            if let Some(occurrence) = self.occurrences.get_mut(literal.var().index()) {
                *occurrence += if literal.is_positive() { 1 } else { -1 };
            }
        }
        if kind == ConstraintKind::Conflict {
            self.decay_activities();
        }
    }

    fn update_reason(&mut self, reason: &[Literal], _resolved: Option<Literal>) {
        for &literal in reason {
            self.bump_activity(literal.var());
        }
    }

    fn undo_until(&mut self, assignments: &Assignments, start: usize) {
        for &literal in &assignments.trail()[start..] {
            if literal.var().index() < self.heap.len() {
                self.heap.restore_key(literal.var());
            }
        }
    }

    fn resurrect(&mut self, var: Var) {
        if var.index() < self.heap.len() {
            self.heap.restore_key(var);
        }
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let assignments = solver.assignments();
        self.grow(assignments.num_vars());
        while let Some(candidate) = self.heap.peek_max() {
            if !assignments.is_free(candidate) {
                self.heap.delete_key(candidate);
                continue;
            }
            let occurrence = self.occurrences[candidate.index()];
            return Some(match occurrence {
                o if o > 0 => Literal::positive(candidate),
                o if o < 0 => Literal::negative(candidate),
                _ => assignments.preferred_literal(candidate),
            });
        }
        None
    }
}
