use super::GeometricSequence;
use super::SequenceGenerator;

/// A geometric sequence which starts over whenever it exceeds an outer limit.
///
/// Each time the inner sequence passes the outer limit, the limit itself grows by a factor of
/// `1.5`.
#[derive(Debug, Copy, Clone)]
pub struct InnerOuterSequence {
    inner: GeometricSequence,
    outer: u64,
}

impl InnerOuterSequence {
    pub fn new(base: u64, factor: f64, outer: u64) -> InnerOuterSequence {
        InnerOuterSequence {
            inner: GeometricSequence::new(base, factor),
            outer,
        }
    }
}

impl SequenceGenerator for InnerOuterSequence {
    fn next(&mut self) -> u64 {
        let value = self.inner.next();
        if value > self.outer {
            self.outer = (self.outer as f64 * 1.5) as u64;
            self.inner.reset();
            return self.inner.next();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::InnerOuterSequence;
    use crate::basic_types::sequence_generators::SequenceGenerator;

    #[test]
    fn inner_sequence_restarts_when_passing_the_outer_limit() {
        let mut sequence = InnerOuterSequence::new(100, 2.0, 300);
        let values = (0..8).map(|_| sequence.next()).collect::<Vec<_>>();

        // The outer limit goes from 300 to 450 to 675.
        assert_eq!(values, vec![100, 200, 100, 200, 400, 100, 200, 400]);
    }

    #[test]
    fn sequence_is_reproducible() {
        let mut first = InnerOuterSequence::new(32, 1.5, 1000);
        let mut second = InnerOuterSequence::new(32, 1.5, 1000);

        for _ in 0..200 {
            assert_eq!(first.next(), second.next());
        }
    }
}
