//! Detects unfounded sets: atoms of a positive loop which are not false but can only be derived
//! through each other.
//!
//! The checker owns the atoms of non-trivial strongly connected components of the positive
//! dependency graph and the bodies supporting them. Whenever one of the watched literals becomes
//! false it is marked dirty; at the propagation fixpoint the solver then asks it for a
//! [`LoopNogood`], which is turned into loop clauses.
use super::Constraint;
use super::PropagationContext;
use super::PropagationResult;
use crate::basic_types::WeightedLiteral;
use crate::engine::assignments::Assignments;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;

/// A body supporting atoms of a single strongly connected component.
#[derive(Clone, Debug)]
pub struct UfsBody {
    pub literal: Literal,
    /// Positive body atoms from the component of the heads (as indices returned by
    /// [`UnfoundedCheck::add_atom`]) with their weights.
    pub internal: Vec<(u32, i64)>,
    /// The remaining literals of a weight body; empty for normal bodies.
    pub external: Vec<WeightedLiteral>,
    /// The bound of a weight body, `None` for a normal body.
    pub bound: Option<i64>,
}

#[derive(Clone, Debug)]
struct UfsAtom {
    var: Var,
    component: u32,
    supports: Vec<u32>,
    /// Bodies in which the atom occurs internally, with its weight.
    dependents: Vec<(u32, i64)>,
}

#[derive(Clone, Debug)]
struct StoredBody {
    body: UfsBody,
    heads: Vec<u32>,
}

/// An unfounded set and the false literals of its external support.
///
/// For every atom `a` of the set, the clause `!a | external...` is a valid loop nogood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LoopNogood {
    pub(crate) atoms: Vec<Literal>,
    pub(crate) external: Vec<Literal>,
}

#[derive(Clone, Debug, Default)]
pub struct UnfoundedCheck {
    atoms: Vec<UfsAtom>,
    bodies: Vec<StoredBody>,
    components: Vec<Vec<u32>>,
    dirty: bool,
    // scratch space of the founded-set computation
    founded: Vec<bool>,
    missing: Vec<u32>,
    reached: Vec<i64>,
    queue: Vec<u32>,
}

impl UnfoundedCheck {
    pub fn add_atom(&mut self, var: Var, component: u32) -> u32 {
        let index = self.atoms.len() as u32;
        self.atoms.push(UfsAtom {
            var,
            component,
            supports: vec![],
            dependents: vec![],
        });
        if self.components.len() <= component as usize {
            self.components.resize_with(component as usize + 1, Vec::new);
        }
        self.components[component as usize].push(index);
        self.dirty = true;
        index
    }

    pub fn add_body(&mut self, body: UfsBody) -> u32 {
        let index = self.bodies.len() as u32;
        for &(atom, weight) in &body.internal {
            self.atoms[atom as usize].dependents.push((index, weight));
        }
        self.bodies.push(StoredBody {
            body,
            heads: vec![],
        });
        index
    }

    /// Registers `body` as a support of `atom`.
    pub fn add_support(&mut self, atom: u32, body: u32) {
        self.atoms[atom as usize].supports.push(body);
        self.bodies[body as usize].heads.push(atom);
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The literals whose falsification may create an unfounded set.
    pub(crate) fn watches(&self) -> impl Iterator<Item = (Literal, u32)> + '_ {
        self.bodies.iter().flat_map(|stored| {
            std::iter::once(!stored.body.literal)
                .chain(stored.body.external.iter().map(|element| !element.literal))
                .map(|literal| (literal, 0))
        })
    }

    /// The variables which have to keep their identity for the check to be sound.
    pub(crate) fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.atoms.iter().map(|atom| atom.var).chain(
            self.bodies
                .iter()
                .flat_map(|stored| {
                    std::iter::once(stored.body.literal)
                        .chain(stored.body.external.iter().map(|element| element.literal))
                })
                .map(|literal| literal.var()),
        )
    }

    /// Searches the components for an unfounded set; clears the dirty flag when there is none.
    pub(crate) fn find_unfounded_set(&mut self, assignments: &Assignments) -> Option<LoopNogood> {
        if !self.dirty {
            return None;
        }
        for component in 0..self.components.len() {
            if let Some(nogood) = self.check_component(component, assignments) {
                return Some(nogood);
            }
        }
        self.dirty = false;
        None
    }

    fn is_valid(&self, body: u32, assignments: &Assignments) -> bool {
        let stored = &self.bodies[body as usize].body;
        if assignments.is_false(stored.literal) {
            return false;
        }
        match stored.bound {
            None => self.missing[body as usize] == 0,
            Some(bound) => self.reached[body as usize] >= bound,
        }
    }

    fn check_component(&mut self, component: usize, assignments: &Assignments) -> Option<LoopNogood> {
        self.founded.clear();
        self.founded.resize(self.atoms.len(), false);
        self.missing.clear();
        self.reached.clear();
        for stored in &self.bodies {
            self.missing.push(stored.body.internal.len() as u32);
            self.reached.push(
                stored
                    .body
                    .external
                    .iter()
                    .filter(|element| !assignments.is_false(element.literal))
                    .map(|element| element.weight)
                    .sum(),
            );
        }

        // Atoms with a valid support that does not depend on the component.
        self.queue.clear();
        for &atom in &self.components[component] {
            let details = &self.atoms[atom as usize];
            if assignments.is_false(Literal::positive(details.var)) {
                continue;
            }
            if details
                .supports
                .iter()
                .any(|&body| self.is_valid(body, assignments))
            {
                self.founded[atom as usize] = true;
                self.queue.push(atom);
            }
        }

        while let Some(atom) = self.queue.pop() {
            for index in 0..self.atoms[atom as usize].dependents.len() {
                let (body, weight) = self.atoms[atom as usize].dependents[index];
                let was_valid = self.is_valid(body, assignments);
                self.missing[body as usize] -= 1;
                self.reached[body as usize] += weight;
                if was_valid || !self.is_valid(body, assignments) {
                    continue;
                }
                for head_index in 0..self.bodies[body as usize].heads.len() {
                    let head = self.bodies[body as usize].heads[head_index];
                    let details = &self.atoms[head as usize];
                    if !self.founded[head as usize]
                        && details.component as usize == component
                        && !assignments.is_false(Literal::positive(details.var))
                    {
                        self.founded[head as usize] = true;
                        self.queue.push(head);
                    }
                }
            }
        }

        let unfounded: Vec<u32> = self.components[component]
            .iter()
            .copied()
            .filter(|&atom| {
                !self.founded[atom as usize]
                    && !assignments.is_false(Literal::positive(self.atoms[atom as usize].var))
            })
            .collect();
        if unfounded.is_empty() {
            return None;
        }

        let mut in_set = vec![false; self.atoms.len()];
        for &atom in &unfounded {
            in_set[atom as usize] = true;
        }

        let mut external = vec![];
        for &atom in &unfounded {
            for &body in &self.atoms[atom as usize].supports {
                let stored = &self.bodies[body as usize].body;
                let depends_on_set = stored
                    .internal
                    .iter()
                    .any(|&(other, _)| in_set[other as usize]);
                match stored.bound {
                    None if depends_on_set => {}
                    _ if assignments.is_false(stored.literal) => external.push(stored.literal),
                    None => {}
                    Some(_) => {
                        external.extend(
                            stored
                                .external
                                .iter()
                                .map(|element| element.literal)
                                .filter(|&literal| assignments.is_false(literal)),
                        );
                        external.extend(
                            stored
                                .internal
                                .iter()
                                .filter(|&&(other, _)| !in_set[other as usize])
                                .map(|&(other, _)| Literal::positive(self.atoms[other as usize].var))
                                .filter(|&literal| assignments.is_false(literal)),
                        );
                    }
                }
            }
        }
        external.sort_by_key(|literal| literal.code());
        external.dedup();

        Some(LoopNogood {
            atoms: unfounded
                .iter()
                .map(|&atom| Literal::positive(self.atoms[atom as usize].var))
                .collect(),
            external,
        })
    }
}

impl Constraint for UnfoundedCheck {
    fn propagate(
        &mut self,
        _literal: Literal,
        _data: u32,
        _context: &mut PropagationContext<'_>,
    ) -> PropagationResult {
        self.dirty = true;
        PropagationResult::keep(true)
    }

    fn reason(&self, _literal: Literal, _assignments: &Assignments, _reason: &mut Vec<Literal>) {
        // Loop nogoods are added as clauses, which act as the reasons.
    }
}
