use std::fmt::Display;
use std::ops::Not;

use super::Var;
use crate::containers::StorageKey;

/// A variable together with a sign. The code is `var * 2 + sign`, where a set sign bit means the
/// literal is negative.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    code: u32,
}

impl Literal {
    /// The positive literal of the sentinel variable; it is true at level 0.
    pub const TRUE: Literal = Literal { code: 0 };
    pub const FALSE: Literal = Literal { code: 1 };

    pub const fn new(var: Var, is_positive: bool) -> Literal {
        Literal {
            code: var.id() * 2 + (!is_positive) as u32,
        }
    }

    pub const fn positive(var: Var) -> Literal {
        Literal::new(var, true)
    }

    pub const fn negative(var: Var) -> Literal {
        Literal::new(var, false)
    }

    pub const fn var(self) -> Var {
        Var::new(self.code >> 1)
    }

    /// True if the literal is negative.
    pub const fn sign(self) -> bool {
        self.code & 1 == 1
    }

    pub const fn is_positive(self) -> bool {
        !self.sign()
    }

    pub const fn is_negative(self) -> bool {
        self.sign()
    }

    pub const fn code(self) -> u32 {
        self.code
    }

    /// Maps a non-zero DIMACS integer onto a literal.
    pub fn from_dimacs(value: i32) -> Literal {
        Literal::new(Var::new(value.unsigned_abs()), value > 0)
    }

    pub fn to_dimacs(self) -> i64 {
        let id = self.var().id() as i64;
        if self.is_positive() {
            id
        } else {
            -id
        }
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            code: self.code ^ 1,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_negative() {
            write!(f, "~{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

impl StorageKey for Literal {
    fn index(&self) -> usize {
        self.code as usize
    }

    fn create_from_index(index: usize) -> Self {
        Literal { code: index as u32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_flips_only_the_sign() {
        let var = Var::new(7);
        let literal = Literal::positive(var);

        assert_eq!(!literal, Literal::negative(var));
        assert_eq!(!!literal, literal);
        assert_eq!((!literal).var(), var);
        assert!((!literal).sign());
    }

    #[test]
    fn dimacs_conversion() {
        assert_eq!(Literal::from_dimacs(-3), Literal::negative(Var::new(3)));
        assert_eq!(Literal::from_dimacs(5).to_dimacs(), 5);
        assert_eq!(format!("{}", Literal::from_dimacs(-3)), "~x3");
    }
}
