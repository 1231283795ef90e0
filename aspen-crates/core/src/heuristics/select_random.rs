use rand::rngs::SmallRng;

use super::DecisionHeuristic;
use crate::basic_types::shuffle;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Solver;

/// Decides free variables in a random order which is fixed once constraints are added.
#[derive(Debug)]
pub struct SelectRandom {
    vars: Vec<Var>,
    cursor: usize,
    random_generator: SmallRng,
}

impl SelectRandom {
    pub fn new(random_generator: SmallRng) -> SelectRandom {
        SelectRandom {
            vars: vec![],
            cursor: 0,
            random_generator,
        }
    }
}

impl DecisionHeuristic for SelectRandom {
    fn end_init(&mut self, solver: &Solver) {
        self.vars = solver.assignments().vars().collect();
        shuffle(&mut self.vars, &mut self.random_generator);
        self.cursor = 0;
    }

    fn resurrect(&mut self, var: Var) {
        if !self.vars.contains(&var) {
            self.vars.push(var);
        }
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        let assignments = solver.assignments();
        if self.vars.len() < assignments.num_vars() as usize {
            // Variables added after initialisation are appended in index order.
            let known = self.vars.len() as u32;
            self.vars
                .extend((known + 1..=assignments.num_vars()).map(Var::new));
        }
        let num_vars = self.vars.len();
        for offset in 0..num_vars {
            let position = (self.cursor + offset) % num_vars;
            let var = self.vars[position];
            if assignments.is_free(var) {
                self.cursor = position;
                return Some(assignments.preferred_literal(var));
            }
        }
        None
    }
}
