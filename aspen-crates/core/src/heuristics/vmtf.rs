use super::moms_score;
use super::DecayedScore;
use super::DecisionHeuristic;
use crate::engine::constraints::ConstraintKind;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::Solver;

/// The number of variables of a learnt conflict clause which are moved to the front.
const MOVES_PER_CONFLICT: usize = 8;
/// The number of variables of a loop nogood which are moved to the front.
const MOVES_PER_LOOP: usize = 4;
const DECAY_INTERVAL: u64 = 512;
/// Marks the end of the list and variables which are not in the list.
const NIL: u32 = 0;

/// Variable move-to-front: keeps the variables in a list from which the first free one is
/// decided. The most active variables of every learnt clause are moved to the front of the list.
/// Initially the list is ordered by MOMS score.
#[derive(Debug)]
pub struct Vmtf {
    /// Index 0 is the head of the list.
    next: Vec<u32>,
    previous: Vec<u32>,
    in_list: Vec<bool>,
    /// Where the scan for a free variable starts; everything in front of it is assigned.
    cursor: u32,
    scores: Vec<DecayedScore>,
    occurrences: Vec<i32>,
    decay: u32,
    decisions: u64,
    loops: bool,
}

impl Vmtf {
    pub fn new(loops: bool) -> Vmtf {
        Vmtf {
            next: vec![NIL],
            previous: vec![NIL],
            in_list: vec![false],
            cursor: NIL,
            scores: vec![DecayedScore::default()],
            occurrences: vec![0],
            decay: 0,
            decisions: 0,
            loops,
        }
    }

    /// The variables in list order.
    pub fn order(&self) -> Vec<Var> {
        let mut order = vec![];
        let mut current = self.next[0];
        while current != NIL {
            order.push(Var::new(current));
            current = self.next[current as usize];
        }
        order
    }

    /// Makes room for new variables, which are appended to the end of the list.
    fn grow(&mut self, num_vars: u32) {
        while self.next.len() <= num_vars as usize {
            let var = self.next.len() as u32;
            self.next.push(NIL);
            self.previous.push(NIL);
            self.in_list.push(false);
            self.scores.push(DecayedScore::default());
            self.occurrences.push(0);
            self.push_back(var);
        }
    }

    fn push_back(&mut self, var: u32) {
        let last = self.previous[0];
        self.next[last as usize] = var;
        self.previous[var as usize] = last;
        self.next[var as usize] = NIL;
        self.previous[0] = var;
        self.in_list[var as usize] = true;
    }

    fn unlink(&mut self, var: u32) {
        if !self.in_list[var as usize] {
            return;
        }
        let previous = self.previous[var as usize];
        let next = self.next[var as usize];
        self.next[previous as usize] = next;
        self.previous[next as usize] = previous;
        self.in_list[var as usize] = false;
        if self.cursor == var {
            self.cursor = next;
        }
    }

    fn push_front(&mut self, var: u32) {
        self.unlink(var);
        let first = self.next[0];
        self.next[var as usize] = first;
        self.previous[var as usize] = NIL;
        self.previous[first as usize] = var;
        self.next[0] = var;
        self.in_list[var as usize] = true;
        self.cursor = self.next[0];
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
}

impl DecisionHeuristic for Vmtf {
    fn end_init(&mut self, solver: &Solver) {
        self.grow(solver.num_vars());
        let mut vars: Vec<Var> = self.order();
        vars.sort_by_key(|&var| std::cmp::Reverse(moms_score(solver.watch_lists(), var)));
        for var in vars.into_iter().rev() {
            self.push_front(var.id());
        }
    }

    fn new_constraint(
        &mut self,
        assignments: &Assignments,
        literals: &[Literal],
        kind: ConstraintKind,
    ) {
        let moves = match kind {
            ConstraintKind::Static => return,
            ConstraintKind::Loop if !self.loops => return,
            ConstraintKind::Loop => MOVES_PER_LOOP,
            ConstraintKind::Conflict => MOVES_PER_CONFLICT,
        };
        self.grow(assignments.num_vars());
        for &literal in literals {
            self.bump(literal.var());
            self.occurrences[literal.var().id() as usize] +=
                if literal.is_positive() { 1 } else { -1 };
        }

        let mut vars: Vec<Var> = literals.iter().map(|literal| literal.var()).collect();
        vars.sort_by_key(|&var| std::cmp::Reverse(self.activity(var)));
        vars.truncate(moves);
        for var in vars.into_iter().rev() {
            self.push_front(var.id());
        }
    }

    fn update_reason(&mut self, reason: &[Literal], _resolved: Option<Literal>) {
        for &literal in reason {
            self.bump(literal.var());
        }
    }

    fn undo_until(&mut self, _assignments: &Assignments, _start: usize) {
        self.cursor = self.next[0];
    }

    fn simplify(&mut self, assignments: &Assignments, start: usize) {
        for &literal in &assignments.trail()[start..] {
            if (literal.var().id() as usize) < self.in_list.len() {
                self.unlink(literal.var().id());
            }
        }
    }

    fn resurrect(&mut self, var: Var) {
        if (var.id() as usize) < self.in_list.len() && !self.in_list[var.id() as usize] {
            self.push_front(var.id());
        }
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let assignments = solver.assignments();
        self.grow(assignments.num_vars());
        self.decisions += 1;
        if self.decisions % DECAY_INTERVAL == 0 {
            self.decay += 1;
        }

        if self.cursor == NIL {
            self.cursor = self.next[0];
        }
        while self.cursor != NIL {
            let var = Var::new(self.cursor);
            if assignments.is_free(var) {
                return Some(match self.occurrences[var.id() as usize] {
                    o if o > 0 => Literal::positive(var),
                    o if o < 0 => Literal::negative(var),
                    _ => assignments.preferred_literal(var),
                });
            }
            self.cursor = self.next[self.cursor as usize];
        }
        None
    }
}
