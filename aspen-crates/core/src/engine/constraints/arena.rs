use std::fmt::Display;
use std::fmt::Formatter;

use super::StoredConstraint;

/// A handle to a constraint in the [`ConstraintArena`].
///
/// Slots are reused once a constraint is removed; the generation makes handles to removed
/// constraints detectably stale, which lets watch lists drop them lazily.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintRef {
    index: u32,
    generation: u32,
}

impl Display for ConstraintRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}.{}", self.index, self.generation)
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    constraint: Option<StoredConstraint>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ConstraintArena {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    num_live: usize,
}

impl ConstraintArena {
    pub(crate) fn insert(&mut self, constraint: StoredConstraint) -> ConstraintRef {
        self.num_live += 1;
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.constraint = Some(constraint);
            return ConstraintRef {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            constraint: Some(constraint),
        });
        ConstraintRef {
            index,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, constraint: ConstraintRef) -> Option<&StoredConstraint> {
        self.slots
            .get(constraint.index as usize)
            .filter(|slot| slot.generation == constraint.generation)
            .and_then(|slot| slot.constraint.as_ref())
    }

    pub(crate) fn get_mut(&mut self, constraint: ConstraintRef) -> Option<&mut StoredConstraint> {
        self.slots
            .get_mut(constraint.index as usize)
            .filter(|slot| slot.generation == constraint.generation)
            .and_then(|slot| slot.constraint.as_mut())
    }

    pub(crate) fn contains(&self, constraint: ConstraintRef) -> bool {
        self.get(constraint).is_some()
    }

    pub(crate) fn remove(&mut self, constraint: ConstraintRef) -> Option<StoredConstraint> {
        let slot = self.slots.get_mut(constraint.index as usize)?;
        if slot.generation != constraint.generation {
            return None;
        }
        let removed = slot.constraint.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(constraint.index);
        self.num_live -= 1;
        Some(removed)
    }

    pub(crate) fn len(&self) -> usize {
        self.num_live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraints::Clause;
    use crate::engine::variables::Literal;
    use crate::engine::variables::Var;

    fn clause() -> StoredConstraint {
        let literals = (1..=4).map(|id| Literal::positive(Var::new(id))).collect();
        StoredConstraint::Clause(Clause::new(literals, None))
    }

    #[test]
    fn removed_handles_become_stale_when_the_slot_is_reused() {
        let mut arena = ConstraintArena::default();
        let first = arena.insert(clause());
        assert!(arena.remove(first).is_some());

        let second = arena.insert(clause());
        assert_eq!(second.index, first.index);
        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let mut arena = ConstraintArena::default();
        let handle = arena.insert(clause());
        assert!(arena.remove(handle).is_some());
        assert!(arena.remove(handle).is_none());
        assert_eq!(arena.len(), 0);
    }
}
