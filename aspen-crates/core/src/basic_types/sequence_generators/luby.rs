use super::SequenceGenerator;

// The Luby sequence 1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8, ... scaled by a base value.
// The next element is computed in constant time using Knuth's 'reluctant doubling' formula.
#[derive(Debug, Copy, Clone)]
pub struct LubySequence {
    u: i64,
    v: i64,
    base_value: u64,
}

impl LubySequence {
    pub fn new(base_value: u64) -> LubySequence {
        LubySequence {
            u: 1,
            v: 1,
            base_value,
        }
    }
}

impl SequenceGenerator for LubySequence {
    fn next(&mut self) -> u64 {
        let next_value = self.v as u64;
        if (self.u & (-self.u)) == self.v {
            self.u += 1;
            self.v = 1;
        } else {
            self.v *= 2;
        }
        next_value.saturating_mul(self.base_value)
    }
}

#[cfg(test)]
mod tests {
    use super::LubySequence;
    use crate::basic_types::sequence_generators::SequenceGenerator;

    fn luby_compute_recursively(i: usize) -> usize {
        let k = (i + 1).ilog2();
        if (i + 1).is_power_of_two() {
            1 << (k - 1)
        } else {
            luby_compute_recursively(i + 1 - (1 << k))
        }
    }

    #[test]
    fn base_one_prefix() {
        let mut luby_sequence = LubySequence::new(1);
        let values = (0..15).map(|_| luby_sequence.next()).collect::<Vec<_>>();
        assert_eq!(values, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[test]
    fn scaled_sequence_matches_the_recursive_definition() {
        let mut luby_sequence = LubySequence::new(50);
        for i in 1..100000 {
            assert_eq!(luby_sequence.next(), (luby_compute_recursively(i) * 50) as u64);
        }
    }
}
