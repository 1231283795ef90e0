use super::constraints::ConstraintRef;
use super::variables::Literal;

/// Why a literal was assigned.
///
/// The literals stored in the short variants are the literals which were true and together implied
/// the assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reason {
    /// A decision, a root-level fact, or a literal forced by backtracking.
    #[default]
    Decision,
    Binary(Literal),
    Ternary(Literal, Literal),
    Constraint(ConstraintRef),
}

impl Reason {
    pub fn is_decision(&self) -> bool {
        matches!(self, Reason::Decision)
    }

    pub(crate) fn kind(&self) -> AntecedentKind {
        match self {
            Reason::Decision => AntecedentKind::None,
            Reason::Binary(_) => AntecedentKind::Binary,
            Reason::Ternary(_, _) => AntecedentKind::Ternary,
            Reason::Constraint(_) => AntecedentKind::Other,
        }
    }
}

/// Classification of reasons, used to restrict conflict clause minimisation.
#[derive(Debug, enumset::EnumSetType)]
pub enum AntecedentKind {
    None,
    Binary,
    Ternary,
    Other,
}
