use std::fmt::Debug;
use std::ops::ControlFlow;

use crate::engine::variables::Literal;
use crate::engine::variables::Value;
use crate::engine::variables::Var;
use crate::engine::Solver;
use crate::solve::SolveOutcome;

/// Which consequences are collected by consequence enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConsequenceKind {
    /// Atoms true in some model.
    Brave,
    /// Atoms true in every model.
    Cautious,
}

/// A model found by the search, or derived from one by a [`ModelExpander`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    /// The 1-based number of the model.
    pub number: u64,
    /// The value of every variable, indexed by variable id; index 0 is the sentinel.
    values: Vec<Value>,
    /// The sums of the minimize constraint, most significant rule first.
    pub costs: Option<Vec<i64>>,
    /// The consequences collected so far if consequences are enumerated.
    pub consequences: Option<(ConsequenceKind, Vec<Var>)>,
}

impl Model {
    /// Captures the current assignment of `solver`.
    pub fn from_solver(number: u64, solver: &Solver) -> Model {
        let mut values = Vec::with_capacity(solver.num_vars() as usize + 1);
        values.push(Value::True);
        values.extend(solver.assignments().vars().map(|var| solver.value(var)));
        Model {
            number,
            values,
            costs: solver
                .minimize_constraint()
                .map(|minimize| minimize.sums().to_vec()),
            consequences: None,
        }
    }

    /// A model with the given true literals; variables not mentioned are false.
    pub fn from_literals(number: u64, num_vars: u32, literals: &[Literal]) -> Model {
        let mut values = vec![Value::False; num_vars as usize + 1];
        values[0] = Value::True;
        for literal in literals {
            if let Some(value) = values.get_mut(literal.var().id() as usize) {
                *value = if literal.is_positive() {
                    Value::True
                } else {
                    Value::False
                };
            }
        }
        Model {
            number,
            values,
            costs: None,
            consequences: None,
        }
    }

    pub fn num_vars(&self) -> u32 {
        self.values.len() as u32 - 1
    }

    pub fn value(&self, var: Var) -> Value {
        self.values
            .get(var.id() as usize)
            .copied()
            .unwrap_or(Value::Free)
    }

    pub fn is_true(&self, literal: Literal) -> bool {
        match self.value(literal.var()) {
            Value::True => literal.is_positive(),
            Value::False => !literal.is_positive(),
            Value::Free => false,
        }
    }

    /// The literals which are true in the model, by increasing variable.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.values
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(id, value)| {
                let var = Var::new(id as u32);
                match value {
                    Value::True => Some(Literal::positive(var)),
                    Value::False => Some(Literal::negative(var)),
                    Value::Free => None,
                }
            })
    }

    /// The variables which are true in the model.
    pub fn true_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.literals()
            .filter(|literal| literal.is_positive())
            .map(|literal| literal.var())
    }
}

/// Receives the models found during enumeration and the final outcome.
pub trait ModelHandler {
    /// Called for every model; breaking stops the enumeration.
    fn on_model(&mut self, solver: &Solver, model: &Model) -> ControlFlow<()>;

    /// Called once when the enumeration has ended.
    fn on_complete(&mut self, _solver: &Solver, _outcome: SolveOutcome) {}
}

impl<T> ModelHandler for T
where
    T: FnMut(&Solver, &Model) -> ControlFlow<()>,
{
    fn on_model(&mut self, solver: &Solver, model: &Model) -> ControlFlow<()> {
        (self)(solver, model)
    }
}

/// Ignores every model.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullModelHandler;

impl ModelHandler for NullModelHandler {
    fn on_model(&mut self, _solver: &Solver, _model: &Model) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Derives further models from a model found by the search, e.g. the models which are symmetric
/// to it under a preprocessing step. The derived models are reported after the original one and
/// count towards the number of requested models.
pub trait ModelExpander: Debug {
    fn expand(&mut self, model: &Model) -> Vec<Model>;
}
