//! An indexed max-heap over dense keys `0..n`.
//!
//! Keys can be taken out of the heap temporarily (e.g. when a variable is assigned) and put back
//! later with their value intact. Values of removed keys can still be bumped and rescaled.
use std::ops::AddAssign;
use std::ops::DivAssign;

use super::KeyedVec;
use super::StorageKey;
use crate::aspen_assert_moderate;

#[derive(Debug, Clone)]
pub struct KeyValueHeap<Key, Value> {
    /// The values in heap order; positions `[0, end_position)` form the heap.
    values: Vec<Value>,
    map_key_to_position: KeyedVec<Key, usize>,
    map_position_to_key: Vec<Key>,
    end_position: usize,
}

impl<Key: StorageKey, Value> Default for KeyValueHeap<Key, Value> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            map_key_to_position: KeyedVec::new(),
            map_position_to_key: Vec::new(),
            end_position: 0,
        }
    }
}

impl<Key, Value> KeyValueHeap<Key, Value>
where
    Key: StorageKey + Copy,
    Value: AddAssign<Value> + DivAssign<Value> + PartialOrd + Default + Copy,
{
    /// The key with the largest value without removing it.
    pub(crate) fn peek_max(&self) -> Option<Key> {
        (self.end_position > 0).then(|| self.map_position_to_key[0])
    }

    pub(crate) fn get_value(&self, key: Key) -> Value {
        aspen_assert_moderate!(key.index() < self.map_key_to_position.len());
        self.values[self.map_key_to_position[key]]
    }

    /// Removes the key with the largest value from the heap and returns it.
    pub(crate) fn pop_max(&mut self) -> Option<Key> {
        let best_key = self.peek_max()?;
        self.delete_key(best_key);
        Some(best_key)
    }

    /// Adds `increment` to the value of `key`, restoring the heap property if the key is present.
    pub(crate) fn increment(&mut self, key: Key, increment: Value) {
        let position = self.map_key_to_position[key];
        self.values[position] += increment;
        if self.is_key_present(key) {
            self.sift_up(position);
        }
    }

    /// Puts a previously deleted key back into the heap.
    pub(crate) fn restore_key(&mut self, key: Key) {
        if self.is_key_present(key) {
            return;
        }
        let position = self.map_key_to_position[key];
        aspen_assert_moderate!(position >= self.end_position);
        self.swap_positions(position, self.end_position);
        self.end_position += 1;
        self.sift_up(self.end_position - 1);
    }

    /// Takes `key` out of the heap while keeping its value.
    pub(crate) fn delete_key(&mut self, key: Key) {
        if !self.is_key_present(key) {
            return;
        }
        let position = self.map_key_to_position[key];
        self.swap_positions(position, self.end_position - 1);
        self.end_position -= 1;
        if position < self.end_position {
            self.sift_down(position);
        }
    }

    /// The number of keys, including the deleted ones.
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn num_present(&self) -> usize {
        self.end_position
    }

    pub(crate) fn is_key_present(&self, key: Key) -> bool {
        key.index() < self.map_key_to_position.len()
            && self.map_key_to_position[key] < self.end_position
    }

    /// Adds a new key with the given value. Keys have to be added in index order.
    pub(crate) fn grow(&mut self, key: Key, value: Value) {
        aspen_assert_moderate!(key.index() == self.values.len());
        let last_position = self.values.len();
        self.values.push(value);
        let _ = self.map_key_to_position.push(last_position);
        self.map_position_to_key.push(key);

        self.swap_positions(self.end_position, last_position);
        self.end_position += 1;
        self.sift_up(self.end_position - 1);
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.map_key_to_position.clear();
        self.map_position_to_key.clear();
        self.end_position = 0;
    }

    /// Divides every value (of present and deleted keys) by `divisor`.
    pub(crate) fn divide_values(&mut self, divisor: Value) {
        for value in self.values.iter_mut() {
            *value /= divisor;
        }
    }

    fn swap_positions(&mut self, a: usize, b: usize) {
        let key_a = self.map_position_to_key[a];
        let key_b = self.map_position_to_key[b];

        self.values.swap(a, b);
        self.map_position_to_key.swap(a, b);
        self.map_key_to_position.swap(key_a.index(), key_b.index());
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.values[parent] >= self.values[position] {
                break;
            }
            self.swap_positions(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            if left >= self.end_position {
                break;
            }
            let right = left + 1;
            let largest_child =
                if right < self.end_position && self.values[right] > self.values[left] {
                    right
                } else {
                    left
                };
            if self.values[position] >= self.values[largest_child] {
                break;
            }
            self.swap_positions(position, largest_child);
            position = largest_child;
        }
    }
}
