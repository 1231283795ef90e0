use std::path::Path;

#[derive(Hash, Eq, PartialEq, Copy, Clone, Debug)]
pub(crate) enum FileFormat {
    /// Propositional formulas in DIMACS CNF.
    CnfDimacsPLine,
    /// Ground logic programs in the numeric smodels format produced by lparse and gringo.
    Smodels,
}

impl FileFormat {
    /// The format of an instance, derived from the extension of its path.
    pub(crate) fn from_path(path: &Path) -> Option<FileFormat> {
        match path.extension().and_then(|extension| extension.to_str())? {
            "cnf" | "dimacs" => Some(FileFormat::CnfDimacsPLine),
            "sm" | "smodels" | "lparse" => Some(FileFormat::Smodels),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_follow_the_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("instances/queens.cnf")),
            Some(FileFormat::CnfDimacsPLine)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("hamiltonian.sm")),
            Some(FileFormat::Smodels)
        );
        assert_eq!(FileFormat::from_path(Path::new("model.fzn")), None);
        assert_eq!(FileFormat::from_path(Path::new("no_extension")), None);
    }
}
