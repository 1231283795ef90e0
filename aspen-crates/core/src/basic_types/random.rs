use std::fmt::Debug;
use std::ops::Range;

use rand::Rng;
use rand::SeedableRng;

use crate::aspen_assert_moderate;

/// Abstraction for randomness, so tests can swap in a deterministic source.
pub trait Random: Debug {
    /// Generates a bool which is true with the given probability; `probability` has to be in
    /// `[0, 1]`.
    fn generate_bool(&mut self, probability: f64) -> bool;

    /// Generates a usize uniformly from `[range.start, range.end)`.
    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize;

    /// Generates a float uniformly from `[0, 1)`.
    fn generate_f64(&mut self) -> f64;
}

impl<T> Random for T
where
    T: SeedableRng + Rng + Debug,
{
    fn generate_bool(&mut self, probability: f64) -> bool {
        aspen_assert_moderate!(
            (0.0..=1.0).contains(&probability),
            "It should hold that 0.0 <= {probability} <= 1.0"
        );

        self.gen_bool(probability)
    }

    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize {
        self.gen_range(range)
    }

    fn generate_f64(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

/// Shuffles `elements` in place (Fisher-Yates).
pub(crate) fn shuffle<T>(elements: &mut [T], random: &mut impl Random) {
    for index in (1..elements.len()).rev() {
        let other = random.generate_usize_in_range(0..index + 1);
        elements.swap(index, other);
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn shuffle_keeps_the_elements() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut elements = (0..20).collect::<Vec<u32>>();
        shuffle(&mut elements, &mut rng);

        let mut sorted = elements.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }
}
