//! Watch lists indexed by literal. The lists of a literal are inspected when it becomes true.
//!
//! A binary clause `(p | q)` is stored as the implication `!p -> q` in the list of `!p` and as
//! `!q -> p` in the list of `!q`; ternary clauses are stored in all three lists the same way.
use super::constraints::ConstraintRef;
use super::variables::Literal;
use super::variables::Var;
use crate::containers::KeyedVec;

/// A watch of a constraint stored in the arena; `data` is passed back on propagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Watch {
    pub(crate) constraint: ConstraintRef,
    pub(crate) data: u32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct WatchList {
    /// Literals implied by the owner of the list.
    pub(crate) binary: Vec<Literal>,
    /// Pairs of which one literal is implied once the other is false.
    pub(crate) ternary: Vec<(Literal, Literal)>,
    pub(crate) general: Vec<Watch>,
}

#[derive(Clone, Debug, Default)]
pub struct WatchLists {
    lists: KeyedVec<Literal, WatchList>,
}

impl WatchLists {
    /// Makes room for the literals of `num_vars` variables.
    pub(crate) fn grow(&mut self, num_vars: u32) {
        self.lists.accomodate(
            Literal::negative(Var::new(num_vars.saturating_sub(1))),
            WatchList::default(),
        );
    }

    pub(crate) fn list(&self, literal: Literal) -> &WatchList {
        &self.lists[literal]
    }

    pub(crate) fn list_mut(&mut self, literal: Literal) -> &mut WatchList {
        &mut self.lists[literal]
    }

    pub(crate) fn add_binary(&mut self, p: Literal, q: Literal) {
        self.lists[!p].binary.push(q);
        self.lists[!q].binary.push(p);
    }

    pub(crate) fn add_ternary(&mut self, p: Literal, q: Literal, r: Literal) {
        self.lists[!p].ternary.push((q, r));
        self.lists[!q].ternary.push((p, r));
        self.lists[!r].ternary.push((p, q));
    }

    pub(crate) fn add_watch(&mut self, literal: Literal, watch: Watch) {
        self.lists[literal].general.push(watch);
    }

    /// Removes the binary clauses containing `p` which is true on the root level, returning
    /// how many were removed.
    pub(crate) fn remove_satisfied_binary(&mut self, p: Literal) -> usize {
        let others = std::mem::take(&mut self.lists[!p].binary);
        for &q in &others {
            let list = &mut self.lists[!q].binary;
            if let Some(position) = list.iter().position(|&other| other == p) {
                let _ = list.swap_remove(position);
            }
        }
        others.len()
    }

    /// Removes the ternary clauses containing `p` which is true on the root level, returning
    /// how many were removed.
    pub(crate) fn remove_satisfied_ternary(&mut self, p: Literal) -> usize {
        let others = std::mem::take(&mut self.lists[!p].ternary);
        for &(q, r) in &others {
            Self::remove_pair(&mut self.lists[!q].ternary, p, r);
            Self::remove_pair(&mut self.lists[!r].ternary, p, q);
        }
        others.len()
    }

    /// Takes the ternary clauses containing `!p`, where `p` is true on the root level, out of
    /// every list. Returns the remaining pairs; each of them is a binary clause now.
    pub(crate) fn take_falsified_ternary(&mut self, p: Literal) -> Vec<(Literal, Literal)> {
        let pairs = std::mem::take(&mut self.lists[p].ternary);
        for &(q, r) in &pairs {
            Self::remove_pair(&mut self.lists[!q].ternary, !p, r);
            Self::remove_pair(&mut self.lists[!r].ternary, !p, q);
        }
        pairs
    }

    fn remove_pair(list: &mut Vec<(Literal, Literal)>, a: Literal, b: Literal) {
        if let Some(position) = list
            .iter()
            .position(|&pair| pair == (a, b) || pair == (b, a))
        {
            let _ = list.swap_remove(position);
        }
    }

    /// Drops the general watches of both literals of a variable assigned on the root level.
    pub(crate) fn clear_general(&mut self, p: Literal) {
        self.lists[p].general.clear();
        self.lists[!p].general.clear();
    }

    pub fn num_binary(&self, literal: Literal) -> usize {
        self.lists[literal].binary.len()
    }

    pub fn num_ternary(&self, literal: Literal) -> usize {
        self.lists[literal].ternary.len()
    }

    /// The literals implied by `literal` through binary clauses.
    pub fn binary_implications(&self, literal: Literal) -> &[Literal] {
        &self.lists[literal].binary
    }
}
