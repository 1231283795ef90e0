use super::SequenceGenerator;

/// The i-th element is `base * factor^i`, rounded down.
///
/// The element is computed from the index and not from the previous element, so rounding errors do
/// not accumulate. A factor of `1.0` gives a fixed-interval schedule.
#[derive(Debug, Copy, Clone)]
pub struct GeometricSequence {
    base: u64,
    factor: f64,
    index: u32,
}

impl GeometricSequence {
    pub fn new(base: u64, factor: f64) -> GeometricSequence {
        GeometricSequence {
            base,
            factor,
            index: 0,
        }
    }

    pub(crate) fn value_at(&self, index: u32) -> u64 {
        (self.base as f64 * self.factor.powi(index as i32)) as u64
    }

    pub(crate) fn reset(&mut self) {
        self.index = 0;
    }
}

impl SequenceGenerator for GeometricSequence {
    fn next(&mut self) -> u64 {
        let value = self.value_at(self.index);
        self.index += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::GeometricSequence;
    use crate::basic_types::sequence_generators::SequenceGenerator;

    #[test]
    fn powers_of_two() {
        let mut geometric_sequence = GeometricSequence::new(1, 2.0);
        for i in 0..63 {
            assert_eq!(geometric_sequence.next(), 1_u64 << i);
        }
    }

    #[test]
    fn factor_one_and_a_half() {
        let mut geometric_sequence = GeometricSequence::new(100, 1.5);
        let values = (0..6).map(|_| geometric_sequence.next()).collect::<Vec<_>>();
        assert_eq!(values, vec![100, 150, 225, 337, 506, 759]);
    }
}
