use thiserror::Error;

use super::ConstraintOperationError;
#[cfg(doc)]
use crate::program::ProgramBuilder;

/// Errors related to building a logic program with the [`ProgramBuilder`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// Atoms are numbered from 1 and must fit into a solver variable.
    #[error("Atom {0} is out of bounds")]
    AtomOutOfBounds(u32),
    #[error("Rule type {0} is not supported")]
    UnsupportedRuleType(u32),
    #[error("The weights of a rule must not be negative, got {0}")]
    NegativeWeight(i64),
    #[error("The sum of the weights of a rule overflows")]
    WeightOverflow,
    /// The program was already translated into constraints.
    #[error("The program cannot be changed after it has been ended")]
    ProgramAlreadyFrozen,
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error(transparent)]
    Constraint(#[from] ConstraintOperationError),
}
