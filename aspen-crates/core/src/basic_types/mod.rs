mod constraint_operation_error;
mod program_error;
mod random;
pub mod sequence_generators;
mod trail;
mod weighted_literal;

pub use constraint_operation_error::ConstraintOperationError;
pub use program_error::ProgramError;
pub use random::Random;
pub(crate) use random::shuffle;
pub(crate) use trail::Trail;
pub use weighted_literal::WeightedLiteral;
