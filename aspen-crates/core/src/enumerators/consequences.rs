use super::ConsequenceKind;
use super::Model;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Solver;

/// Tracks the brave or cautious consequences of the models seen so far.
///
/// Every atom carries a flag telling whether it currently is a consequence: for brave
/// consequences the flag is set once the atom is true in some model, for cautious consequences it
/// is cleared once the atom is false in some model.
#[derive(Clone, Debug)]
pub(crate) struct Consequences {
    kind: ConsequenceKind,
    atoms: Vec<Var>,
    consequence: Vec<bool>,
    models: u64,
}

impl Consequences {
    pub(crate) fn new(kind: ConsequenceKind, atoms: Vec<Var>) -> Consequences {
        let initial = kind == ConsequenceKind::Cautious;
        Consequences {
            kind,
            consequence: vec![initial; atoms.len()],
            atoms,
            models: 0,
        }
    }

    pub(crate) fn kind(&self) -> ConsequenceKind {
        self.kind
    }

    /// Merges `model` into the consequences.
    pub(crate) fn add_model(&mut self, model: &Model) {
        self.models += 1;
        for (&atom, consequence) in self.atoms.iter().zip(self.consequence.iter_mut()) {
            let is_true = model.is_true(Literal::positive(atom));
            match self.kind {
                ConsequenceKind::Brave => *consequence |= is_true,
                ConsequenceKind::Cautious => *consequence &= is_true,
            }
        }
    }

    /// The atoms which are consequences of every model added so far; empty before the first
    /// model.
    pub(crate) fn current(&self) -> Vec<Var> {
        if self.models == 0 {
            return vec![];
        }
        self.atoms
            .iter()
            .zip(&self.consequence)
            .filter(|(_, &consequence)| consequence)
            .map(|(&atom, _)| atom)
            .collect()
    }

    /// The clause a further model has to satisfy to change the consequences: some brave
    /// candidate becomes true, or some cautious consequence becomes false. Literals false at the
    /// root can never be satisfied and are left out; an empty clause means the consequences are
    /// final.
    pub(crate) fn next_model_clause(&self, solver: &Solver) -> Vec<Literal> {
        let assignments = solver.assignments();
        self.atoms
            .iter()
            .zip(&self.consequence)
            .filter_map(|(&atom, &consequence)| match self.kind {
                ConsequenceKind::Brave if !consequence => Some(Literal::positive(atom)),
                ConsequenceKind::Cautious if consequence => Some(Literal::negative(atom)),
                _ => None,
            })
            .filter(|&literal| {
                !(assignments.is_false(literal) && assignments.level(literal.var()) == 0)
            })
            .collect()
    }
}
