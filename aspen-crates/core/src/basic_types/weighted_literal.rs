use crate::engine::variables::Literal;

/// A literal together with its (non-negative) weight in a weight or minimize constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WeightedLiteral {
    pub literal: Literal,
    pub weight: i64,
}

impl WeightedLiteral {
    pub fn new(literal: Literal, weight: i64) -> WeightedLiteral {
        WeightedLiteral { literal, weight }
    }
}

impl From<Literal> for WeightedLiteral {
    fn from(literal: Literal) -> Self {
        WeightedLiteral { literal, weight: 1 }
    }
}
