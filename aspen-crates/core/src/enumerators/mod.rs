//! Enumerators decide how the search continues after a model was found: by flipping the last
//! decision ([`EnumerationMode::Backtrack`]), by recording a nogood which excludes the model
//! ([`EnumerationMode::Record`]), or by constraining the search to models which change the brave
//! or cautious consequences.
//!
//! With a minimize constraint, every model tightens the bound which further models have to
//! beat; the enumeration mode is only used once models as good as the best one are requested.
mod consequences;
mod model;

use std::ops::ControlFlow;

use consequences::Consequences;
use log::debug;
pub use model::ConsequenceKind;
pub use model::Model;
pub use model::ModelExpander;
pub use model::ModelHandler;
pub use model::NullModelHandler;

use crate::engine::constraints::MinimizeMode;
use crate::engine::reason::Reason;
use crate::engine::solver::ClauseStore;
use crate::engine::variables::Literal;
use crate::engine::variables::Value;
use crate::engine::variables::Var;
use crate::engine::Solver;
use crate::solve::SolveOutcome;

/// How the search continues after a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum EnumerationMode {
    /// Flip the last decision and never backjump over it.
    #[default]
    Backtrack,
    /// Add a nogood which excludes the model.
    Record,
    /// Compute the atoms true in some model.
    Brave,
    /// Compute the atoms true in every model.
    Cautious,
}

impl EnumerationMode {
    fn consequences(self) -> Option<ConsequenceKind> {
        match self {
            EnumerationMode::Brave => Some(ConsequenceKind::Brave),
            EnumerationMode::Cautious => Some(ConsequenceKind::Cautious),
            EnumerationMode::Backtrack | EnumerationMode::Record => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnumeratorState {
    #[default]
    Searching,
    ModelFound,
    /// The solver is being prepared for the next model.
    Backtracking,
    Done,
}

#[derive(Clone, Copy, Debug)]
pub struct EnumeratorOptions {
    pub mode: EnumerationMode,
    /// The number of models to compute; 0 computes all of them. Ignored for consequences and
    /// while searching for a single optimal model.
    pub num_models: u64,
    /// Whether models are only distinguished by the visible atoms.
    pub project: bool,
    /// Whether every optimal model is computed instead of a single one.
    pub optimize_all: bool,
    /// Whether the search restarts from the root after each model; only used when recording.
    pub restart_on_model: bool,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        EnumeratorOptions {
            mode: EnumerationMode::default(),
            num_models: 1,
            project: false,
            optimize_all: false,
            restart_on_model: false,
        }
    }
}

/// Reports the models found by the search and prepares the solver for the next one.
#[derive(Debug)]
pub struct Enumerator {
    options: EnumeratorOptions,
    state: EnumeratorState,
    models: u64,
    /// The atoms shown to the user, if not every variable.
    visible: Option<Vec<Var>>,
    projection: Vec<Var>,
    /// Whether models are distinguished by their projected atoms only.
    projecting: bool,
    consequences: Option<Consequences>,
    expander: Option<Box<dyn ModelExpander>>,
    /// Whether a minimize constraint exists; each model then tightens its bound.
    optimizing: bool,
    /// Whether it is known that no further model exists.
    complete: bool,
}

impl Enumerator {
    pub fn new(options: EnumeratorOptions) -> Enumerator {
        Enumerator {
            options,
            state: EnumeratorState::default(),
            models: 0,
            visible: None,
            projection: vec![],
            projecting: false,
            consequences: None,
            expander: None,
            optimizing: false,
            complete: false,
        }
    }

    /// Restricts projection and consequences to `atoms`.
    pub fn set_visible(&mut self, atoms: impl IntoIterator<Item = Var>) {
        self.visible = Some(atoms.into_iter().collect());
    }

    pub fn set_expander(&mut self, expander: Box<dyn ModelExpander>) {
        self.expander = Some(expander);
    }

    pub fn options(&self) -> &EnumeratorOptions {
        &self.options
    }

    pub fn state(&self) -> EnumeratorState {
        self.state
    }

    /// The number of models reported so far.
    pub fn num_models(&self) -> u64 {
        self.models
    }

    pub fn is_optimizing(&self) -> bool {
        self.optimizing
    }

    /// Whether the enumeration ended because no further (or no better) model exists, rather
    /// than because enough models were found.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The projection variables; empty if models are not projected.
    pub fn projection(&self) -> &[Var] {
        &self.projection
    }

    /// The brave or cautious consequences of the models found so far.
    pub fn consequences(&self) -> Option<(ConsequenceKind, Vec<Var>)> {
        self.consequences
            .as_ref()
            .map(|consequences| (consequences.kind(), consequences.current()))
    }

    fn visible_atoms(&self, solver: &Solver) -> Vec<Var> {
        match &self.visible {
            Some(atoms) => atoms.clone(),
            None => solver.assignments().vars().collect(),
        }
    }

    /// Forgets the models of a previous search.
    pub fn reset(&mut self) {
        self.state = EnumeratorState::Searching;
        self.models = 0;
        self.complete = false;
    }

    /// Prepares the solver for enumeration; called once before the search starts.
    pub fn start_search(&mut self, solver: &mut Solver) {
        self.reset();

        self.projecting = self.options.project && self.options.mode.consequences().is_none();
        if self.projecting {
            let mut projection: Vec<Var> = self
                .visible_atoms(solver)
                .into_iter()
                .filter(|&var| solver.is_valid_var(var) && solver.assignments().is_free(var))
                .collect();
            projection.sort_unstable();
            projection.dedup();
            for &var in &projection {
                solver.freeze(var);
            }
            if self.options.mode == EnumerationMode::Backtrack {
                solver.set_priority_vars(projection.clone());
            }
            debug!("Projecting models onto {} variables", projection.len());
            self.projection = projection;
        }

        if let Some(kind) = self.options.mode.consequences() {
            let atoms = self.visible_atoms(solver);
            self.consequences = Some(Consequences::new(kind, atoms));
        }

        self.optimizing = self.options.mode.consequences().is_none();
        let mode = if self.options.optimize_all {
            MinimizeMode::LessEqual
        } else {
            MinimizeMode::Less
        };
        match solver.minimize_constraint_mut() {
            Some(minimize) if self.optimizing => minimize.set_mode(mode),
            _ => self.optimizing = false,
        }
    }

    /// Reports the model the solver just found and prepares the search for the next one. Returns
    /// `false` if the enumeration is complete.
    pub fn on_model(&mut self, solver: &mut Solver, handler: &mut impl ModelHandler) -> bool {
        self.state = EnumeratorState::ModelFound;
        solver.statistics_mut().search.model_decisions +=
            u64::from(solver.decision_level() - solver.root_level());

        let mut model = Model::from_solver(self.models + 1, solver);
        if let Some(consequences) = self.consequences.as_mut() {
            consequences.add_model(&model);
            model.consequences = Some((consequences.kind(), consequences.current()));
        }

        let mut stop = self.report(solver, handler, &model);
        if !stop {
            if let Some(mut expander) = self.expander.take() {
                for mut expanded in expander.expand(&model) {
                    expanded.number = self.models + 1;
                    if self.report(solver, handler, &expanded) {
                        stop = true;
                        break;
                    }
                }
                self.expander = Some(expander);
            }
        }
        if stop {
            self.state = EnumeratorState::Done;
            return false;
        }

        self.state = EnumeratorState::Backtracking;
        let more = self.backtrack_from_model(solver, &model);
        self.state = if more {
            EnumeratorState::Searching
        } else {
            EnumeratorState::Done
        };
        self.complete = !more;
        more
    }

    /// Hands a model to the handler; returns `true` if the enumeration has to stop.
    fn report(&mut self, solver: &mut Solver, handler: &mut impl ModelHandler, model: &Model) -> bool {
        self.models += 1;
        solver.statistics_mut().search.models += 1;
        let stopped = handler.on_model(solver, model) == ControlFlow::Break(());
        let improving = self.optimizing && !self.options.optimize_all;
        let limit_reached = self.consequences.is_none()
            && !improving
            && self.options.num_models != 0
            && self.models >= self.options.num_models;
        stopped || limit_reached
    }

    /// Ends the enumeration and tells the handler the outcome.
    pub fn end_search(
        &mut self,
        solver: &mut Solver,
        handler: &mut impl ModelHandler,
        outcome: SolveOutcome,
    ) {
        self.state = EnumeratorState::Done;
        solver.set_priority_vars(vec![]);
        solver.set_minimize_decisions(false);
        handler.on_complete(solver, outcome);
    }

    fn backtrack_from_model(&mut self, solver: &mut Solver, model: &Model) -> bool {
        let accepts_equal = solver
            .minimize_constraint()
            .is_some_and(|minimize| minimize.mode() == MinimizeMode::LessEqual);
        if self.optimizing && !accepts_equal {
            return self.tighten_bound(solver, model);
        }

        if self.optimizing {
            let level = solver.decision_level();
            if let Some(minimize) = solver.minimize_constraint_mut() {
                let _ = minimize.set_model(level);
            }
        }
        if self.projecting && self.projection_level(solver) <= solver.root_level() {
            // The projected atoms are fixed, so this was the only projected model.
            return false;
        }

        let more = if let Some(consequences) = &self.consequences {
            let clause = consequences.next_model_clause(solver);
            !clause.is_empty() && add_nogood(solver, clause, ClauseStore::Native)
        } else {
            match self.options.mode {
                EnumerationMode::Record => self.record(solver),
                _ => self.backtrack(solver),
            }
        };
        if more && self.optimizing && !solver.has_conflict() {
            let _ = solver.backpropagate_minimize();
        }
        more
    }

    /// Records the current sums as the bound to beat and backjumps to the level on which the
    /// bound is first exceeded; the resulting conflict is resolved by the search.
    fn tighten_bound(&mut self, solver: &mut Solver, model: &Model) -> bool {
        if model
            .costs
            .as_ref()
            .is_some_and(|costs| costs.iter().all(|&cost| cost == 0))
        {
            // Nothing can beat a model without costs.
            return false;
        }
        let decision_level = solver.decision_level();
        let Some(minimize) = solver.minimize_constraint_mut() else {
            return false;
        };
        let level = minimize.set_model(decision_level);
        solver.set_minimize_decisions(true);

        solver.set_backtrack_level(solver.root_level());
        solver.undo_until(level);
        let _ = solver.backpropagate_minimize();
        true
    }

    /// Adds a nogood over the decisions (or the projected literals) of the model.
    fn record(&mut self, solver: &mut Solver) -> bool {
        let root_level = solver.root_level();
        let nogood: Vec<Literal> = if !self.projecting {
            (root_level + 1..=solver.decision_level())
                .map(|level| !solver.assignments().decision(level))
                .collect()
        } else {
            self.projected_nogood(solver)
        };
        if nogood.is_empty() {
            return false;
        }
        if self.options.restart_on_model {
            solver.set_backtrack_level(root_level);
            solver.undo_until(root_level);
        }
        add_nogood(solver, nogood, ClauseStore::Native)
    }

    /// Flips the last decision. With projection, the search first jumps back to the level of
    /// the last projection variable, so every projected assignment is reported once.
    fn backtrack(&mut self, solver: &mut Solver) -> bool {
        if !self.projecting {
            return solver.backtrack();
        }
        let projection_level = self.projection_level(solver);
        if projection_level <= solver.backtrack_level() {
            return solver.backtrack();
        }
        if let [var] = self.projection[..] {
            // The complement of the single projected literal holds for all further models.
            let complement = if solver.assignments().value(var) == Value::True {
                Literal::negative(var)
            } else {
                Literal::positive(var)
            };
            solver.undo_until(0);
            if !solver.force(complement, Reason::Decision) {
                return false;
            }
            solver.set_backtrack_level(solver.decision_level());
            return true;
        }
        solver.undo_until(projection_level);

        // The nogood lives until its level is undone; conflicts on the backtrack level are
        // resolved by flipping decisions, so nothing is learnt from it.
        let nogood = self.projected_nogood(solver);
        if nogood.is_empty() {
            return false;
        }
        solver.set_backtrack_level(solver.decision_level());
        add_nogood(solver, nogood, ClauseStore::Scoped)
    }

    /// The highest decision level on which a projection variable is assigned.
    fn projection_level(&self, solver: &Solver) -> u32 {
        let assignments = solver.assignments();
        self.projection
            .iter()
            .map(|&var| assignments.level(var))
            .max()
            .unwrap_or(0)
    }

    /// The negation of the projected literals assigned above the root level.
    fn projected_nogood(&self, solver: &Solver) -> Vec<Literal> {
        let assignments = solver.assignments();
        self.projection
            .iter()
            .filter(|&&var| assignments.level(var) > solver.root_level())
            .map(|&var| {
                if assignments.value(var) == Value::True {
                    Literal::negative(var)
                } else {
                    Literal::positive(var)
                }
            })
            .collect()
    }
}

/// Adds a clause the current assignment violates. Returns `false` only if it cannot be satisfied
/// above the root level.
fn add_nogood(solver: &mut Solver, clause: Vec<Literal>, store: ClauseStore) -> bool {
    let on_root = clause
        .iter()
        .all(|literal| solver.assignments().level(literal.var()) <= solver.root_level());
    let _ = solver.integrate_clause(clause, store);
    !(on_root && solver.has_conflict())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::termination::Indefinite;
    use crate::engine::variables::VarKind;
    use crate::basic_types::WeightedLiteral;
    use crate::engine::SearchResult;
    use crate::engine::SolverOptions;
    use crate::heuristics::HeuristicKind;
    use crate::heuristics::HeuristicOptions;
    use crate::heuristics::LookaheadKind;

    fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    fn solver(num_vars: u32, clauses: &[&[i32]]) -> Solver {
        finished(adding_solver(SolverOptions::default(), num_vars, clauses))
    }

    /// A solver which still accepts constraints.
    fn adding_solver(options: SolverOptions, num_vars: u32, clauses: &[&[i32]]) -> Solver {
        let mut solver = Solver::new(options);
        for _ in 0..num_vars {
            let _ = solver.add_var(VarKind::Atom);
        }
        solver.start_add_constraints();
        for clause in clauses {
            solver
                .add_clause(clause.iter().map(|&id| lit(id)))
                .expect("no root conflict");
        }
        solver
    }

    fn finished(mut solver: Solver) -> Solver {
        assert!(solver.end_add_constraints(false));
        solver
    }

    fn heuristic_options(kind: HeuristicKind) -> SolverOptions {
        SolverOptions {
            heuristic: HeuristicOptions {
                kind,
                lookahead: (kind == HeuristicKind::Lookahead).then_some(LookaheadKind::Atom),
                ..HeuristicOptions::default()
            },
            ..SolverOptions::default()
        }
    }

    const HEURISTICS: [HeuristicKind; 6] = [
        HeuristicKind::First,
        HeuristicKind::Random,
        HeuristicKind::Lookahead,
        HeuristicKind::Berkmin,
        HeuristicKind::Vmtf,
        HeuristicKind::Vsids,
    ];

    /// The value of x1 in every model, when enumerating projected onto x1.
    fn projected_on_first(mut solver: Solver, mode: EnumerationMode) -> Vec<bool> {
        let mut enumerator = Enumerator::new(EnumeratorOptions {
            project: true,
            ..all_models(mode)
        });
        enumerator.set_visible([Var::new(1)]);

        let models = enumerate(&mut solver, &mut enumerator);
        let mut values: Vec<bool> = models.iter().map(|model| model.contains(&1)).collect();
        values.sort();
        values
    }

    /// Searches until the enumerator is done; returns the true variables of every model.
    fn enumerate(solver: &mut Solver, enumerator: &mut Enumerator) -> Vec<Vec<u32>> {
        let mut models = vec![];
        let mut handler = |_: &Solver, model: &Model| {
            models.push(model.true_vars().map(Var::id).collect::<Vec<_>>());
            ControlFlow::Continue(())
        };
        enumerator.start_search(solver);
        loop {
            match solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite) {
                SearchResult::Model => {
                    if !enumerator.on_model(solver, &mut handler) {
                        break;
                    }
                }
                SearchResult::Unsatisfiable => break,
                SearchResult::Restart | SearchResult::Interrupted => {}
            }
        }
        models.sort();
        models
    }

    fn all_models(mode: EnumerationMode) -> EnumeratorOptions {
        EnumeratorOptions {
            mode,
            num_models: 0,
            ..EnumeratorOptions::default()
        }
    }

    #[test]
    fn backtracking_enumerates_every_model_once() {
        let mut solver = solver(3, &[&[1, 2, 3], &[-1, -2]]);
        let mut enumerator = Enumerator::new(all_models(EnumerationMode::Backtrack));

        let models = enumerate(&mut solver, &mut enumerator);
        assert_eq!(
            models,
            vec![vec![1], vec![1, 3], vec![2], vec![2, 3], vec![3]]
        );
        assert_eq!(enumerator.num_models(), 5);
        assert_eq!(enumerator.state(), EnumeratorState::Done);
    }

    #[test]
    fn recording_enumerates_every_model_once() {
        let mut solver = solver(3, &[&[1, 2, 3], &[-1, -2]]);
        let mut enumerator = Enumerator::new(all_models(EnumerationMode::Record));

        let models = enumerate(&mut solver, &mut enumerator);
        assert_eq!(
            models,
            vec![vec![1], vec![1, 3], vec![2], vec![2, 3], vec![3]]
        );
    }

    #[test]
    fn recording_with_restarts_enumerates_every_model_once() {
        let mut solver = solver(3, &[&[1, 2], &[-2, 3]]);
        let mut enumerator = Enumerator::new(EnumeratorOptions {
            restart_on_model: true,
            ..all_models(EnumerationMode::Record)
        });

        let models = enumerate(&mut solver, &mut enumerator);
        assert_eq!(models, vec![vec![1], vec![1, 2, 3], vec![1, 3], vec![2, 3]]);
    }

    #[test]
    fn the_model_limit_stops_the_enumeration() {
        let mut solver = solver(3, &[]);
        let mut enumerator = Enumerator::new(EnumeratorOptions {
            num_models: 3,
            ..EnumeratorOptions::default()
        });

        let models = enumerate(&mut solver, &mut enumerator);
        assert_eq!(models.len(), 3);
        assert_eq!(solver.statistics().search.models, 3);
    }

    #[test]
    fn projected_models_are_reported_once() {
        for mode in [EnumerationMode::Backtrack, EnumerationMode::Record] {
            let mut solver = solver(4, &[&[1, 2, 3, 4]]);
            let mut enumerator = Enumerator::new(EnumeratorOptions {
                project: true,
                ..all_models(mode)
            });
            enumerator.set_visible([Var::new(1), Var::new(2)]);

            let models = enumerate(&mut solver, &mut enumerator);
            let mut projected: Vec<Vec<u32>> = models
                .into_iter()
                .map(|model| model.into_iter().filter(|&id| id <= 2).collect())
                .collect();
            projected.sort();
            assert_eq!(projected, vec![vec![], vec![1], vec![1, 2], vec![2]], "{mode:?}");
        }
    }

    #[test]
    fn projection_onto_root_assigned_atoms_yields_one_model() {
        for mode in [EnumerationMode::Backtrack, EnumerationMode::Record] {
            let mut solver = solver(3, &[&[-1]]);
            let mut enumerator = Enumerator::new(EnumeratorOptions {
                project: true,
                ..all_models(mode)
            });
            enumerator.set_visible([Var::new(1)]);

            let models = enumerate(&mut solver, &mut enumerator);
            assert_eq!(models.len(), 1, "{mode:?}");
            assert_eq!(enumerator.state(), EnumeratorState::Done);
            assert!(enumerator.is_complete());
        }
    }

    #[test]
    fn single_projected_atom_is_flipped_after_each_model() {
        let clauses: &[&[i32]] = &[
            &[4, 2, 3],
            &[-4, -6, 5],
            &[-6, -1],
            &[1, 2],
            &[-2, 4],
            &[2, -4],
        ];
        for kind in HEURISTICS {
            for learning in [true, false] {
                let options = SolverOptions {
                    learning,
                    ..heuristic_options(kind)
                };
                let solver = finished(adding_solver(options, 6, clauses));

                assert_eq!(
                    projected_on_first(solver, EnumerationMode::Backtrack),
                    vec![false, true],
                    "{kind:?}, learning: {learning}"
                );
            }
        }
    }

    #[test]
    fn projection_nogoods_conflicting_below_the_root_are_kept() {
        for kind in HEURISTICS {
            for mode in [EnumerationMode::Backtrack, EnumerationMode::Record] {
                let options = SolverOptions {
                    learning: false,
                    ..heuristic_options(kind)
                };
                let mut solver = adding_solver(options, 7, &[&[-1, -2], &[2, -7], &[-7]]);
                // x3 <-> 2 <= x1 + x4 + x5 and x6 <-> 1 <= x2 + x5
                solver
                    .add_weight_constraint(
                        lit(3),
                        [1, 4, 5].map(|id| WeightedLiteral::new(lit(id), 1)),
                        2,
                    )
                    .expect("no root conflict");
                solver
                    .add_weight_constraint(
                        lit(6),
                        [2, 5].map(|id| WeightedLiteral::new(lit(id), 1)),
                        1,
                    )
                    .expect("no root conflict");
                let solver = finished(solver);

                assert_eq!(
                    projected_on_first(solver, mode),
                    vec![false, true],
                    "{kind:?}, {mode:?}"
                );
            }
        }
    }

    #[test]
    fn brave_and_cautious_consequences() {
        // Exactly one of x1, x2 is true and x3 always is.
        let clauses: &[&[i32]] = &[&[1, 2], &[-1, -2], &[3]];

        let mut solver = solver(3, clauses);
        let mut enumerator = Enumerator::new(all_models(EnumerationMode::Brave));
        let _ = enumerate(&mut solver, &mut enumerator);
        assert_eq!(
            enumerator.consequences(),
            Some((ConsequenceKind::Brave, vec![Var::new(1), Var::new(2), Var::new(3)]))
        );

        let mut solver = self::solver(3, clauses);
        let mut enumerator = Enumerator::new(all_models(EnumerationMode::Cautious));
        let _ = enumerate(&mut solver, &mut enumerator);
        assert_eq!(
            enumerator.consequences(),
            Some((ConsequenceKind::Cautious, vec![Var::new(3)]))
        );
    }

    #[derive(Debug)]
    struct Mirror;

    impl ModelExpander for Mirror {
        fn expand(&mut self, model: &Model) -> Vec<Model> {
            let flipped: Vec<Literal> = model.literals().map(|literal| !literal).collect();
            vec![Model::from_literals(0, model.num_vars(), &flipped)]
        }
    }

    #[test]
    fn expanded_models_are_reported_after_the_original() {
        let mut solver = solver(2, &[&[1, -2], &[-1, 2]]);
        let mut enumerator = Enumerator::new(EnumeratorOptions {
            num_models: 0,
            ..EnumeratorOptions::default()
        });
        enumerator.set_expander(Box::new(Mirror));

        let mut numbers = vec![];
        let mut handler = |_: &Solver, model: &Model| {
            numbers.push(model.number);
            ControlFlow::Continue(())
        };
        enumerator.start_search(&mut solver);
        assert_eq!(
            solver.search(u64::MAX, u64::MAX, 0.0, false, &mut Indefinite),
            SearchResult::Model
        );
        assert!(enumerator.on_model(&mut solver, &mut handler));
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(enumerator.num_models(), 2);
    }
}
