use thiserror::Error;

#[cfg(doc)]
use crate::engine::Solver;
use crate::engine::variables::Var;

/// Errors related to adding constraints to the [`Solver`].
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintOperationError {
    /// Adding the clause led to a conflict at the root.
    #[error("Adding the clause failed because it is infeasible at the root")]
    InfeasibleClause,
    /// A constraint was added while the [`Solver`] was already in an infeasible state.
    #[error("Adding constraint failed because the solver is in an infeasible state")]
    InfeasibleState,
    /// Constraints can only be added between `start_add_constraints` and the first search.
    #[error("Constraints cannot be added once search has started")]
    AddingConstraintsAfterInit,
    #[error("The bound of a weight constraint must not be negative, got {0}")]
    NegativeBound(i64),
    #[error("The weights of a weight constraint must not be negative, got {0}")]
    NegativeWeight(i64),
    #[error("The sum of the weights of a constraint overflows")]
    WeightOverflow,
    #[error("Variable {0} is not known to the solver")]
    InvalidVariable(Var),
}
