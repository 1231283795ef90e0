use std::iter::Rev;
use std::ops::Deref;
use std::vec::Drain;

use crate::aspen_assert_simple;

/// An append-only sequence partitioned into decision levels.
///
/// Level 0 starts at position 0; level `k > 0` starts at `level_starts[k - 1]`.
#[derive(Clone, Debug)]
pub(crate) struct Trail<T> {
    level_starts: Vec<usize>,
    trail: Vec<T>,
}

impl<T> Default for Trail<T> {
    fn default() -> Self {
        Trail {
            level_starts: Vec::default(),
            trail: Vec::default(),
        }
    }
}

impl<T> Trail<T> {
    pub(crate) fn new_level(&mut self) {
        self.level_starts.push(self.trail.len());
    }

    pub(crate) fn decision_level(&self) -> u32 {
        self.level_starts.len() as u32
    }

    /// The trail position of the first element of `level`.
    pub(crate) fn level_start(&self, level: u32) -> usize {
        aspen_assert_simple!(level <= self.decision_level());
        if level == 0 {
            0
        } else {
            self.level_starts[level as usize - 1]
        }
    }

    pub(crate) fn values_at_level(&self, level: u32) -> &[T] {
        let start = self.level_start(level);
        let end = if level == self.decision_level() {
            self.trail.len()
        } else {
            self.level_starts[level as usize]
        };

        &self.trail[start..end]
    }

    /// Removes the top level, yielding its elements from last to first.
    pub(crate) fn pop_level(&mut self) -> Rev<Drain<'_, T>> {
        aspen_assert_simple!(self.decision_level() > 0);
        let start = self.level_starts.pop().unwrap_or(0);
        self.trail.drain(start..).rev()
    }

    pub(crate) fn push(&mut self, elem: T) {
        self.trail.push(elem)
    }
}

impl<T> Deref for Trail<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popping_a_level_yields_its_values_in_reverse_order() {
        let mut trail = Trail::default();
        trail.push(1);

        trail.new_level();
        trail.push(2);
        trail.push(3);

        let popped = trail.pop_level().collect::<Vec<_>>();
        assert_eq!(vec![3, 2], popped);
        assert_eq!(&[1], trail.deref());
        assert_eq!(trail.decision_level(), 0);
    }

    #[test]
    fn empty_levels_are_kept_apart() {
        let mut trail = Trail::default();
        trail.push(1);
        trail.new_level();
        trail.new_level();
        trail.push(2);

        assert_eq!(trail.level_start(1), 1);
        assert_eq!(trail.level_start(2), 1);
        assert!(trail.values_at_level(1).is_empty());
        assert_eq!(&[2], trail.values_at_level(2));

        assert_eq!(trail.pop_level().count(), 1);
        assert_eq!(trail.pop_level().count(), 0);
        assert_eq!(&[1], trail.values_at_level(0));
    }
}
