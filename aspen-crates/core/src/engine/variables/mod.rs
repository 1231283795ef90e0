//! The boolean variable and literal model.
mod literal;
mod value;
mod var;
mod var_kind;

pub use literal::Literal;
pub use value::Value;
pub use var::Var;
pub use var_kind::VarKind;
pub use var_kind::VarRole;
