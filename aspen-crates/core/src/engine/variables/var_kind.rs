use enumset::EnumSet;
use enumset::EnumSetType;

use super::Literal;
use super::Var;

/// The role a variable plays in a logic program.
#[derive(Debug, EnumSetType, Hash)]
pub enum VarRole {
    Atom,
    Body,
}

/// What a variable represents. Pure SAT problems only use atoms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VarKind {
    #[default]
    Atom,
    Body,
    /// An atom which is equivalent to a body.
    AtomBody,
}

impl VarKind {
    pub fn roles(self) -> EnumSet<VarRole> {
        match self {
            VarKind::Atom => VarRole::Atom.into(),
            VarKind::Body => VarRole::Body.into(),
            VarKind::AtomBody => VarRole::Atom | VarRole::Body,
        }
    }

    pub fn matches(self, roles: EnumSet<VarRole>) -> bool {
        !self.roles().is_disjoint(roles)
    }

    /// Atoms prefer to be false, bodies prefer to be true.
    pub fn preferred_literal(self, var: Var) -> Literal {
        match self {
            VarKind::Body => Literal::positive(var),
            VarKind::Atom | VarKind::AtomBody => Literal::negative(var),
        }
    }
}
