use std::fmt::Display;

use crate::containers::StorageKey;

/// A boolean variable. Variable 0 is a sentinel which is permanently true.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Default)]
pub struct Var {
    id: u32,
}

impl Var {
    pub const SENTINEL: Var = Var { id: 0 };

    pub const fn new(id: u32) -> Var {
        Var { id }
    }

    pub const fn id(self) -> u32 {
        self.id
    }

    pub fn is_sentinel(self) -> bool {
        self.id == 0
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.id)
    }
}

impl StorageKey for Var {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        Var::new(index as u32)
    }
}
