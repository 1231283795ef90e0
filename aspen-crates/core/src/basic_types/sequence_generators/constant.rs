use super::SequenceGenerator;

/// A sequence that keeps producing the same value.
#[derive(Debug, Copy, Clone)]
pub struct ConstantSequence {
    constant_value: u64,
}

impl ConstantSequence {
    pub fn new(constant_value: u64) -> ConstantSequence {
        ConstantSequence { constant_value }
    }
}

impl SequenceGenerator for ConstantSequence {
    fn next(&mut self) -> u64 {
        self.constant_value
    }
}
