use crate::containers::HashMap;

/// The names of the atoms of a program.
///
/// Atoms whose name starts with `_` are hidden: they are neither printed nor used for projection.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: HashMap<u32, String>,
}

impl SymbolTable {
    pub fn set_name(&mut self, atom: u32, name: impl Into<String>) {
        let _ = self.names.insert(atom, name.into());
    }

    pub fn name(&self, atom: u32) -> Option<&str> {
        self.names.get(&atom).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The named atoms with their names, by increasing atom.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        let mut atoms: Vec<u32> = self.names.keys().copied().collect();
        atoms.sort_unstable();
        atoms
            .into_iter()
            .map(|atom| (atom, self.names[&atom].as_str()))
    }

    /// The named atoms which are not hidden, by increasing atom.
    pub fn visible(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.iter().filter(|(_, name)| is_visible(name))
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}

fn is_visible(name: &str) -> bool {
    !name.starts_with('_')
}
