//! The solve driver: runs the search under a restart schedule, reduces the learnt database and
//! hands every model to the [`Enumerator`].
mod params;
mod restarts;

use log::debug;
pub use params::RandomisationParams;
pub use params::ReduceParams;
pub use params::RestartParams;
pub use params::SolveParams;
use restarts::RestartSchedule;

use crate::engine::termination::TerminationCondition;
use crate::engine::variables::Literal;
use crate::engine::SearchResult;
use crate::engine::Solver;
use crate::enumerators::Enumerator;
use crate::enumerators::ModelHandler;

/// The fraction of learnt clauses removed on a restart when reducing on restart.
const RESTART_REDUCE_FRACTION: f64 = 0.33;

/// How a solve call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveOutcome {
    /// At least one model was found.
    Satisfiable,
    /// At least one model was found and the last one is proven to be optimal.
    Optimal,
    /// There is no model.
    Unsatisfiable,
    /// There is no model in which all assumptions hold.
    UnsatisfiableUnderAssumptions,
    /// The search was interrupted before a model was found.
    Unknown,
}

/// The result of [`solve`] and [`solve_with_assumptions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolveResult {
    pub outcome: SolveOutcome,
    /// The number of models reported to the handler.
    pub models: u64,
    /// Whether the search space is not yet exhausted, i.e. further models may exist.
    pub more: bool,
}

impl SolveResult {
    pub fn is_satisfiable(&self) -> bool {
        matches!(
            self.outcome,
            SolveOutcome::Satisfiable | SolveOutcome::Optimal
        )
    }
}

/// Searches for the models of the constraints of `solver`, which must have been initialised with
/// [`Solver::end_add_constraints`]. Every model is reported to `handler` through `enumerator`;
/// once the search ends the solver is back on level 0.
pub fn solve(
    solver: &mut Solver,
    params: &SolveParams,
    enumerator: &mut Enumerator,
    handler: &mut impl ModelHandler,
    termination: &mut impl TerminationCondition,
) -> SolveResult {
    solve_with_assumptions(solver, &[], params, enumerator, handler, termination)
}

/// As [`solve`], but only models in which all `assumptions` are true are searched for. The
/// assumptions are undone afterwards.
pub fn solve_with_assumptions(
    solver: &mut Solver,
    assumptions: &[Literal],
    params: &SolveParams,
    enumerator: &mut Enumerator,
    handler: &mut impl ModelHandler,
    termination: &mut impl TerminationCondition,
) -> SolveResult {
    enumerator.reset();
    if solver.is_infeasible() || solver.has_conflict() || !solver.clear_assumptions() {
        return finish(solver, enumerator, handler, SolveOutcome::Unsatisfiable, false);
    }

    for &assumption in assumptions {
        if solver.is_true(assumption) {
            continue;
        }
        let satisfiable = !solver.is_false(assumption) && {
            solver.assume(assumption);
            solver.propagate()
        };
        if !satisfiable {
            debug!("Assumption {assumption} cannot be satisfied");
            let outcome = SolveOutcome::UnsatisfiableUnderAssumptions;
            return finish(solver, enumerator, handler, outcome, false);
        }
    }
    solver.set_root_level(solver.decision_level());

    enumerator.start_search(solver);
    let exhausted = search(solver, params, enumerator, handler, termination);
    let complete = exhausted || enumerator.is_complete();

    let outcome = match enumerator.num_models() {
        0 if !complete => SolveOutcome::Unknown,
        0 if solver.root_level() > 0 && !solver.is_infeasible() => {
            SolveOutcome::UnsatisfiableUnderAssumptions
        }
        0 => SolveOutcome::Unsatisfiable,
        _ if complete && enumerator.is_optimizing() => SolveOutcome::Optimal,
        _ => SolveOutcome::Satisfiable,
    };
    finish(solver, enumerator, handler, outcome, !complete)
}

/// Runs the restart loop until the enumerator is done, the search space is exhausted or the
/// search is interrupted. Returns `true` if the search space was exhausted.
fn search(
    solver: &mut Solver,
    params: &SolveParams,
    enumerator: &mut Enumerator,
    handler: &mut impl ModelHandler,
    termination: &mut impl TerminationCondition,
) -> bool {
    let mut restarts = RestartSchedule::new(params.restart);
    let num_constraints = solver.num_constraints();
    let mut max_learnts =
        params.initial_max_learnts(num_constraints, solver.num_learnt_constraints());
    let bound_learnts = params.max_learnts_bound(num_constraints);

    let mut random_runs = params.randomisation.runs;
    let (mut probability, mut max_conflicts) = if random_runs == 0 {
        (params.randomisation.probability, restarts.next_limit())
    } else {
        (1.0, params.randomisation.conflicts)
    };
    let mut next_shuffle = params.restart.shuffle;

    loop {
        let result = solver.search(
            max_conflicts,
            max_learnts as u64,
            probability,
            params.restart.local,
            termination,
        );
        match result {
            SearchResult::Model => {
                if !enumerator.on_model(solver, handler) {
                    return false;
                }
                random_runs = 0;
                probability = params.randomisation.probability;
                if params.restart.reset_on_model {
                    restarts.reset();
                    max_conflicts = restarts.next_limit();
                }
                if !params.restart.bounded && solver.backtrack_level() > solver.root_level() {
                    max_conflicts = u64::MAX;
                }
            }
            SearchResult::Unsatisfiable => return true,
            SearchResult::Interrupted => return false,
            SearchResult::Restart if random_runs > 0 => {
                random_runs -= 1;
                if random_runs == 0 {
                    max_conflicts = restarts.next_limit();
                    probability = params.randomisation.probability;
                }
            }
            SearchResult::Restart => {
                max_conflicts = restarts.next_limit();
                if params.reduce.reduce_on_restart {
                    solver.reduce_learnts(RESTART_REDUCE_FRACTION);
                }
                let pending = solver.num_learnt_constraints() as f64 + max_conflicts as f64;
                if max_learnts < bound_learnts && pending > max_learnts {
                    max_learnts = (max_learnts * params.reduce.inc).min(f64::from(u32::MAX));
                }
                let restarts_so_far = solver.statistics().search.restarts;
                if params.restart.shuffle > 0 && restarts_so_far >= next_shuffle {
                    next_shuffle += params.restart.shuffle;
                    solver.request_shuffle();
                }
            }
        }
    }
}

fn finish(
    solver: &mut Solver,
    enumerator: &mut Enumerator,
    handler: &mut impl ModelHandler,
    outcome: SolveOutcome,
    more: bool,
) -> SolveResult {
    let consistent = solver.clear_assumptions();
    let outcome = match outcome {
        SolveOutcome::Unknown | SolveOutcome::UnsatisfiableUnderAssumptions if !consistent => {
            debug!("Facts derived under the assumptions are contradictory on their own");
            SolveOutcome::Unsatisfiable
        }
        _ => outcome,
    };
    debug!(
        "Search ended: {outcome:?} after {} models",
        enumerator.num_models()
    );
    enumerator.end_search(solver, handler, outcome);
    SolveResult {
        outcome,
        models: enumerator.num_models(),
        more,
    }
}
