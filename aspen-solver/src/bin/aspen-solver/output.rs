//! Prints models and the final result, in the DIMACS competition format for formulas and in the
//! format of answer set solvers for logic programs.
use std::io::Write;
use std::ops::ControlFlow;

use aspen_solver::enumerators::ConsequenceKind;
use aspen_solver::enumerators::Model;
use aspen_solver::enumerators::ModelHandler;
use aspen_solver::solve::SolveOutcome;
use aspen_solver::variables::Literal;
use aspen_solver::variables::Var;
use aspen_solver::Solver;
use fnv::FnvHashMap;

/// Prints every model as a `v` line with all variables of the formula, followed by the `s` line
/// with the result. Everything else is a `c` comment line.
#[derive(Debug)]
pub(crate) struct DimacsPrinter<W> {
    writer: W,
    variables: Vec<Var>,
    models: u64,
}

impl<W: Write> DimacsPrinter<W> {
    pub(crate) fn new(writer: W, variables: Vec<Var>) -> DimacsPrinter<W> {
        DimacsPrinter {
            writer,
            variables,
            models: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_writer(self) -> W {
        self.writer
    }

    fn write_model(&mut self, model: &Model) -> std::io::Result<()> {
        writeln!(self.writer, "c Answer: {}", model.number)?;
        write!(self.writer, "v")?;
        for (index, &var) in self.variables.iter().enumerate() {
            let code = index as i64 + 1;
            if model.is_true(Literal::positive(var)) {
                write!(self.writer, " {code}")?;
            } else {
                write!(self.writer, " -{code}")?;
            }
        }
        writeln!(self.writer, " 0")
    }

    fn write_result(&mut self, outcome: SolveOutcome) -> std::io::Result<()> {
        let status = match outcome {
            SolveOutcome::Satisfiable | SolveOutcome::Optimal => "SATISFIABLE",
            SolveOutcome::Unsatisfiable | SolveOutcome::UnsatisfiableUnderAssumptions => {
                "UNSATISFIABLE"
            }
            SolveOutcome::Unknown => "UNKNOWN",
        };
        writeln!(self.writer, "c Models: {}", self.models)?;
        writeln!(self.writer, "s {status}")?;
        self.writer.flush()
    }
}

impl<W: Write> ModelHandler for DimacsPrinter<W> {
    fn on_model(&mut self, _solver: &Solver, model: &Model) -> ControlFlow<()> {
        self.models += 1;
        match self.write_model(model) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }

    fn on_complete(&mut self, _solver: &Solver, outcome: SolveOutcome) {
        let _ = self.write_result(outcome);
    }
}

/// Prints every answer set as the names of its true visible atoms, the costs of optimal answer
/// sets, the consequences once they are complete, and a summary.
#[derive(Debug)]
pub(crate) struct AspPrinter<W> {
    writer: W,
    /// The visible atoms, in the order they are printed.
    atoms: Vec<(Var, String)>,
    names: FnvHashMap<Var, usize>,
    models: u64,
    consequences: Option<(ConsequenceKind, Vec<Var>)>,
    costs: Option<Vec<i64>>,
}

impl<W: Write> AspPrinter<W> {
    pub(crate) fn new(writer: W, atoms: Vec<(Var, String)>) -> AspPrinter<W> {
        let names = atoms
            .iter()
            .enumerate()
            .map(|(index, &(var, _))| (var, index))
            .collect();
        AspPrinter {
            writer,
            atoms,
            names,
            models: 0,
            consequences: None,
            costs: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_writer(self) -> W {
        self.writer
    }

    fn write_model(&mut self, model: &Model) -> std::io::Result<()> {
        writeln!(self.writer, "Answer: {}", model.number)?;
        let names = self
            .atoms
            .iter()
            .filter(|(var, _)| model.is_true(Literal::positive(*var)))
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>();
        writeln!(self.writer, "{}", names.join(" "))?;
        if let Some(costs) = &model.costs {
            writeln!(self.writer, "Optimization: {}", join(costs))?;
        }
        Ok(())
    }

    fn write_result(&mut self, outcome: SolveOutcome) -> std::io::Result<()> {
        if let Some((kind, vars)) = &self.consequences {
            let label = match kind {
                ConsequenceKind::Brave => "Brave",
                ConsequenceKind::Cautious => "Cautious",
            };
            let mut indices = vars
                .iter()
                .filter_map(|var| self.names.get(var).copied())
                .collect::<Vec<_>>();
            indices.sort_unstable();
            let names = indices
                .into_iter()
                .map(|index| self.atoms[index].1.as_str())
                .collect::<Vec<_>>();
            writeln!(self.writer, "{label} consequences:")?;
            writeln!(self.writer, "{}", names.join(" "))?;
        }

        let status = match outcome {
            SolveOutcome::Optimal => "OPTIMUM FOUND",
            SolveOutcome::Satisfiable => "SATISFIABLE",
            SolveOutcome::Unsatisfiable | SolveOutcome::UnsatisfiableUnderAssumptions => {
                "UNSATISFIABLE"
            }
            SolveOutcome::Unknown => "UNKNOWN",
        };
        writeln!(self.writer)?;
        writeln!(self.writer, "{status}")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "Models: {}", self.models)?;
        if let Some(costs) = &self.costs {
            writeln!(self.writer, "Optimization: {}", join(costs))?;
        }
        self.writer.flush()
    }
}

impl<W: Write> ModelHandler for AspPrinter<W> {
    fn on_model(&mut self, _solver: &Solver, model: &Model) -> ControlFlow<()> {
        self.models += 1;
        self.costs.clone_from(&model.costs);
        if let Some(consequences) = &model.consequences {
            self.consequences = Some(consequences.clone());
            return ControlFlow::Continue(());
        }
        match self.write_model(model) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }

    fn on_complete(&mut self, _solver: &Solver, outcome: SolveOutcome) {
        let _ = self.write_result(outcome);
    }
}

fn join(values: &[i64]) -> String {
    values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
