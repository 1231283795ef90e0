//! Houses the [`Solver`]: a conflict-driven clause learning search engine over boolean variables,
//! extended with the propagators needed for answer set semantics.
//!
//! The functionality is split over several files:
//! - `constraint_creation` adds problem constraints before search starts;
//! - `propagation` contains the trail manipulation (assigning, propagating and undoing);
//! - `conflict_analysis` derives asserting clauses from conflicts;
//! - `clause_db` manages learnt clauses and root-level simplification;
//! - `lookahead` implements failed-literal detection;
//! - `search` is the decide-propagate-analyse loop.
mod clause_db;
mod conflict_analysis;
mod constraint_creation;
mod lookahead;
mod options;
mod propagation;
mod search;

pub(crate) use constraint_creation::ClauseStore;
use log::debug;
pub use lookahead::LookaheadState;
pub(crate) use lookahead::VarScore;
pub use options::AntecedentFilter;
pub use options::MinimizationStrategy;
pub use options::SolverOptions;
pub use search::SearchResult;

use super::assignments::Assignments;
use super::constraints::Clause;
use super::constraints::ConflictInfo;
use super::constraints::ConstraintArena;
use super::constraints::ConstraintRef;
use super::constraints::MinimizeConstraint;
use super::constraints::UndoLists;
use super::reason::Reason;
use super::solver_statistics::SolverStatistics;
use super::variables::Literal;
use super::variables::Value;
use super::variables::Var;
use super::variables::VarKind;
use super::watch_lists::WatchLists;
use crate::aspen_assert_simple;
use crate::basic_types::ConstraintOperationError;
use crate::heuristics::DecisionHeuristic;
use crate::heuristics::Heuristic;
use crate::heuristics::SelectRandom;

/// A literal which was asserted on a higher level than the one on which it is implied, because
/// backjumping was bounded by the backtrack level. It is re-asserted when the solver backtracks
/// below the level it was asserted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ImpliedLiteral {
    pub(crate) literal: Literal,
    pub(crate) level: u32,
    pub(crate) reason: Reason,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SolverState {
    /// Problem constraints may be added.
    #[default]
    Adding,
    /// `end_add_constraints` was called; only learnt constraints are added from now on.
    Ready,
    /// A conflict was derived at the root.
    Infeasible,
}

/// A conflict-driven clause learning solver.
///
/// Problem constraints are added between [`Solver::start_add_constraints`] and
/// [`Solver::end_add_constraints`]. Binary and ternary clauses are kept directly in the watch
/// lists, every other constraint lives in an arena and is referred to by [`ConstraintRef`]s.
///
/// For model enumeration the solver maintains a backtrack level below which it never backjumps;
/// conflicts on that level are resolved by flipping the last decision instead. The root level
/// marks the end of the assumptions of the current incremental step.
#[derive(Debug)]
pub struct Solver {
    state: SolverState,
    pub(crate) assignments: Assignments,
    pub(crate) watch_lists: WatchLists,
    pub(crate) constraints: ConstraintArena,
    undo_lists: UndoLists,
    /// Problem constraints stored in the arena (clauses and weight constraints).
    natives: Vec<ConstraintRef>,
    /// Learnt clauses stored in the arena, oldest first.
    learnts: Vec<ConstraintRef>,
    /// Clauses which are removed once the level they were added on is undone.
    scoped_nogoods: Vec<(ConstraintRef, u32)>,
    num_binary: u32,
    num_ternary: u32,
    pub(crate) heuristic: Heuristic,
    random_heuristic: Option<SelectRandom>,
    random_probability: f64,
    pub(crate) options: SolverOptions,
    pub(crate) statistics: SolverStatistics,
    /// Set when a constraint failed to force a literal.
    conflict_info: Option<ConflictInfo>,
    /// A conflict set from outside propagation; all its literals are true.
    conflict_nogood: Vec<Literal>,
    /// Position on the trail of the next literal to propagate.
    queue_front: usize,
    root_level: u32,
    backtrack_level: u32,
    implied: Vec<ImpliedLiteral>,
    /// The number of conflicts at the moment each decision level was opened.
    level_conflicts: Vec<u64>,
    minimize: Option<ConstraintRef>,
    unfounded: Option<ConstraintRef>,
    /// Trail position up to which root-level simplification was done.
    last_simplify: usize,
    shuffle_pending: bool,
    /// Variables which are decided before any other free variable.
    priority_vars: Vec<Var>,
    /// Whether literals of the minimize constraint are decided (false) before the heuristic is
    /// asked.
    minimize_decisions: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new(SolverOptions::default())
    }
}

impl Solver {
    pub fn new(options: SolverOptions) -> Solver {
        let heuristic = Heuristic::new(&options.heuristic);
        let mut watch_lists = WatchLists::default();
        watch_lists.grow(1);
        Solver {
            state: SolverState::default(),
            assignments: Assignments::default(),
            watch_lists,
            constraints: ConstraintArena::default(),
            undo_lists: UndoLists::default(),
            natives: vec![],
            learnts: vec![],
            scoped_nogoods: vec![],
            num_binary: 0,
            num_ternary: 0,
            heuristic,
            random_heuristic: None,
            random_probability: 0.0,
            options,
            statistics: SolverStatistics::default(),
            conflict_info: None,
            conflict_nogood: vec![],
            queue_front: 0,
            root_level: 0,
            backtrack_level: 0,
            implied: vec![],
            level_conflicts: vec![],
            minimize: None,
            unfounded: None,
            last_simplify: 0,
            shuffle_pending: false,
            priority_vars: vec![],
            minimize_decisions: false,
        }
    }

    /// Replaces the decision heuristic. Only allowed before constraints are added.
    pub fn set_heuristic(&mut self, heuristic: Heuristic) {
        aspen_assert_simple!(self.state == SolverState::Adding);
        self.heuristic = heuristic;
    }

    pub fn add_var(&mut self, kind: VarKind) -> Var {
        let var = self.assignments.new_var(kind);
        self.watch_lists.grow(self.assignments.num_vars() + 1);
        var
    }

    /// Makes room for `additional` variables which are added later.
    pub fn reserve_vars(&mut self, additional: u32) {
        self.watch_lists
            .grow(self.assignments.num_vars() + additional + 1);
    }

    pub fn num_vars(&self) -> u32 {
        self.assignments.num_vars()
    }

    pub fn num_free_vars(&self) -> u32 {
        self.assignments.num_free_vars()
    }

    pub fn num_assigned_vars(&self) -> u32 {
        self.assignments.num_assigned()
    }

    pub fn is_valid_var(&self, var: Var) -> bool {
        !var.is_sentinel() && self.assignments.is_valid(var)
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn watch_lists(&self) -> &WatchLists {
        &self.watch_lists
    }

    pub fn value(&self, var: Var) -> Value {
        self.assignments.value(var)
    }

    pub fn is_true(&self, literal: Literal) -> bool {
        self.assignments.is_true(literal)
    }

    pub fn is_false(&self, literal: Literal) -> bool {
        self.assignments.is_false(literal)
    }

    pub fn decision_level(&self) -> u32 {
        self.assignments.decision_level()
    }

    pub fn root_level(&self) -> u32 {
        self.root_level
    }

    pub fn backtrack_level(&self) -> u32 {
        self.backtrack_level
    }

    /// The true literal of every variable; only meaningful once all variables are assigned.
    pub fn model(&self) -> impl Iterator<Item = Literal> + '_ {
        self.assignments.vars().filter_map(|var| match self.value(var) {
            Value::True => Some(Literal::positive(var)),
            Value::False => Some(Literal::negative(var)),
            Value::Free => None,
        })
    }

    /// The number of problem constraints, counting short clauses (native and learnt).
    pub fn num_constraints(&self) -> usize {
        self.natives.len() + self.num_binary as usize + self.num_ternary as usize
    }

    pub fn num_binary_constraints(&self) -> u32 {
        self.num_binary
    }

    pub fn num_ternary_constraints(&self) -> u32 {
        self.num_ternary
    }

    /// The number of learnt constraints which are stored in the arena.
    pub fn num_learnt_constraints(&self) -> usize {
        self.learnts.len()
    }

    /// The learnt clauses stored in the arena, oldest first.
    pub fn learnt_clauses(&self) -> impl DoubleEndedIterator<Item = &Clause> + '_ {
        self.learnts.iter().filter_map(|&learnt| {
            self.constraints
                .get(learnt)
                .and_then(|constraint| constraint.as_clause())
        })
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }

    pub fn statistics_mut(&mut self) -> &mut SolverStatistics {
        &mut self.statistics
    }

    pub fn log_statistics(&self, verbose: bool) {
        self.statistics.log(verbose);
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Whether the constraints are known to be unsatisfiable.
    pub fn is_infeasible(&self) -> bool {
        self.state == SolverState::Infeasible
    }

    pub fn has_conflict(&self) -> bool {
        self.conflict_info.is_some() || !self.conflict_nogood.is_empty()
    }

    pub fn minimize_constraint(&self) -> Option<&MinimizeConstraint> {
        self.minimize
            .and_then(|minimize| self.constraints.get(minimize))
            .and_then(|constraint| constraint.as_minimize())
    }

    pub(crate) fn minimize_constraint_mut(&mut self) -> Option<&mut MinimizeConstraint> {
        self.minimize
            .and_then(|minimize| self.constraints.get_mut(minimize))
            .and_then(|constraint| constraint.as_minimize_mut())
    }

    /// Variables that are decided before all others, in the given order.
    pub fn set_priority_vars(&mut self, vars: Vec<Var>) {
        self.priority_vars = vars;
    }

    /// Makes the solver decide the literals of the minimize constraint false before consulting
    /// the heuristic, which leads to cheaper models first.
    pub fn set_minimize_decisions(&mut self, enabled: bool) {
        self.minimize_decisions = enabled;
    }

    /// Eliminated variables are ignored by the search; resurrecting a variable makes it
    /// available to the heuristic again.
    pub fn eliminate(&mut self, var: Var, eliminate: bool) -> Result<(), ConstraintOperationError> {
        if !self.is_valid_var(var) {
            return Err(ConstraintOperationError::InvalidVariable(var));
        }
        if eliminate && (self.assignments.is_frozen(var) || !self.assignments.is_free(var)) {
            return Ok(());
        }
        let was_eliminated = self.assignments.is_eliminated(var);
        self.assignments.set_eliminated(var, eliminate);
        if was_eliminated && !eliminate {
            self.heuristic.resurrect(var);
        }
        Ok(())
    }

    /// Frozen variables are never eliminated.
    pub fn freeze(&mut self, var: Var) {
        self.assignments.set_frozen(var, true);
    }

    /// Marks the current decision level as the root level: search never undoes it.
    pub fn set_root_level(&mut self, level: u32) {
        self.root_level = level.min(self.decision_level());
        self.backtrack_level = self.backtrack_level.max(self.root_level);
    }

    /// Sets the level below which the solver does not backjump.
    pub fn set_backtrack_level(&mut self, level: u32) {
        self.backtrack_level = level.max(self.root_level).min(self.decision_level());
    }

    /// Undoes all assumptions, re-asserts facts which were derived while they were active and
    /// simplifies the constraints.
    pub fn clear_assumptions(&mut self) -> bool {
        self.root_level = 0;
        self.backtrack_level = 0;
        self.undo_until(0);
        let implied = std::mem::take(&mut self.implied);
        for implied_literal in implied {
            if implied_literal.level == 0 {
                let _ = self.force(implied_literal.literal, implied_literal.reason);
            }
        }
        let simplified = self.simplify();
        if !simplified {
            self.state = SolverState::Infeasible;
        }
        simplified
    }

    /// Prepares the solver for adding constraints.
    pub fn start_add_constraints(&mut self) {
        self.watch_lists.grow(self.assignments.num_vars() + 1);
        self.heuristic.start_init(&self.assignments);
    }

    /// Finishes adding constraints: simplifies them and, if `lookahead` is set, runs
    /// failed-literal detection on the atoms until a fixpoint is reached. Returns `false` if the
    /// constraints are unsatisfiable.
    pub fn end_add_constraints(&mut self, lookahead: bool) -> bool {
        if self.state == SolverState::Infeasible {
            return false;
        }
        self.state = SolverState::Ready;

        let mut probe = LookaheadState::for_preprocessing();
        while self.simplify() && lookahead && self.failed_literal(&mut probe) {}

        self.statistics.constraints.natives = self.num_constraints() as u64;
        self.statistics.constraints.native_binary = u64::from(self.num_binary);
        self.statistics.constraints.native_ternary = u64::from(self.num_ternary);

        if self.has_conflict() {
            self.state = SolverState::Infeasible;
            return false;
        }

        let mut heuristic = std::mem::take(&mut self.heuristic);
        heuristic.end_init(self);
        self.heuristic = heuristic;
        if let Some(mut random) = self.random_heuristic.take() {
            random.end_init(self);
            self.random_heuristic = Some(random);
        }
        debug!(
            "Added {} constraints over {} variables ({} fixed)",
            self.num_constraints(),
            self.num_vars(),
            self.assignments.num_assigned()
        );
        true
    }
}
