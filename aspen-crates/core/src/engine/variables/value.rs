use super::Literal;

/// The truth value of a variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Value {
    #[default]
    Free = 0,
    True = 1,
    False = 2,
}

impl Value {
    /// The value a variable has when `literal` is true.
    pub const fn true_value(literal: Literal) -> Value {
        if literal.is_positive() {
            Value::True
        } else {
            Value::False
        }
    }

    pub const fn negate(self) -> Value {
        match self {
            Value::Free => Value::Free,
            Value::True => Value::False,
            Value::False => Value::True,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        self as _
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value {
            0 => Value::Free,
            1 => Value::True,
            2 => Value::False,
            _ => panic!("Unknown bit sequence"),
        }
    }
}
