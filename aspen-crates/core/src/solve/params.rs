use crate::engine::constraints::MinimizeMode;
use crate::enumerators::EnumerationMode;
use crate::enumerators::EnumeratorOptions;

/// When the search restarts.
///
/// The conflict limits follow a Luby sequence scaled by `base` if `inc` is 0, a geometric sequence
/// `base * inc^i` if `outer` is 0, and otherwise a geometric sequence which starts over whenever
/// it exceeds `outer` (which then grows by half). A `base` of 0 disables restarts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartParams {
    pub base: u64,
    pub inc: f64,
    pub outer: u64,
    /// Whether the conflict limit applies to the subtree below the current decision level
    /// instead of the whole search.
    pub local: bool,
    /// Whether restarts stay enabled after a model was found whose backtrack level is above the
    /// root.
    pub bounded: bool,
    /// Whether the restart sequence starts over after each model.
    pub reset_on_model: bool,
    /// Whether the search starts again from the root after each recorded model.
    pub restart_on_model: bool,
    /// Shuffle the constraint databases every `shuffle` restarts; 0 never shuffles.
    pub shuffle: u64,
}

impl Default for RestartParams {
    fn default() -> Self {
        RestartParams {
            base: 100,
            inc: 1.5,
            outer: 0,
            local: false,
            bounded: false,
            reset_on_model: false,
            restart_on_model: false,
            shuffle: 0,
        }
    }
}

/// How large the learnt database may grow before it is reduced.
///
/// The initial limit is the number of problem constraints divided by `base`. After every restart
/// it grows by the factor `inc` until it reaches `max` times the number of problem constraints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReduceParams {
    pub base: f64,
    pub inc: f64,
    pub max: f64,
    /// Whether a third of the learnt clauses is removed on every restart.
    pub reduce_on_restart: bool,
}

impl Default for ReduceParams {
    fn default() -> Self {
        ReduceParams {
            base: 3.0,
            inc: 1.1,
            max: 3.0,
            reduce_on_restart: false,
        }
    }
}

/// Randomised runs before the main search and random decisions during it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RandomisationParams {
    /// The number of runs in which every decision is random.
    pub runs: u32,
    /// The number of conflicts after which a randomised run ends.
    pub conflicts: u64,
    /// The probability of a random decision during the main search.
    pub probability: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveParams {
    pub restart: RestartParams,
    pub reduce: ReduceParams,
    pub randomisation: RandomisationParams,
    pub enumeration: EnumerationMode,
    /// The number of models to compute; 0 computes all of them.
    pub num_models: u64,
    /// Whether models are only distinguished by their named atoms.
    pub project: bool,
    /// Whether only strictly better models are searched for once a model was found.
    pub minimize: MinimizeMode,
    /// Whether all optimal models are computed; implies [`MinimizeMode::LessEqual`].
    pub optimize_all: bool,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            restart: RestartParams::default(),
            reduce: ReduceParams::default(),
            randomisation: RandomisationParams::default(),
            enumeration: EnumerationMode::default(),
            num_models: 1,
            project: false,
            minimize: MinimizeMode::default(),
            optimize_all: false,
        }
    }
}

impl SolveParams {
    /// The options of the enumerator which reports the models of a solve call.
    pub fn enumerator_options(&self) -> EnumeratorOptions {
        EnumeratorOptions {
            mode: self.enumeration,
            num_models: self.num_models,
            project: self.project,
            optimize_all: self.optimize_all || self.minimize == MinimizeMode::LessEqual,
            restart_on_model: self.restart.restart_on_model,
        }
    }

    /// The limit of learnt clauses at the start of the search.
    pub(crate) fn initial_max_learnts(&self, num_constraints: usize, num_learnts: usize) -> f64 {
        if self.reduce.base <= 0.0 {
            return f64::from(u32::MAX);
        }
        let max_learnts = (num_constraints as f64 / self.reduce.base).max(MIN_LEARNTS);
        if max_learnts < num_learnts as f64 {
            return (max_learnts + num_constraints as f64).min(f64::from(u32::MAX));
        }
        max_learnts
    }

    /// The largest limit of learnt clauses.
    pub(crate) fn max_learnts_bound(&self, num_constraints: usize) -> f64 {
        (num_constraints as f64 * self.reduce.max)
            .max(MIN_LEARNTS)
            .min(f64::from(u32::MAX))
    }
}

/// The learnt database is never limited to fewer clauses than this.
const MIN_LEARNTS: f64 = 10.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learnt_limit_is_a_fraction_of_the_problem() {
        let params = SolveParams::default();
        assert_eq!(params.initial_max_learnts(300, 0), 100.0);
        assert_eq!(params.max_learnts_bound(300), 900.0);
        assert_eq!(params.initial_max_learnts(3, 0), MIN_LEARNTS);
    }

    #[test]
    fn existing_learnts_raise_the_limit() {
        let params = SolveParams::default();
        assert_eq!(params.initial_max_learnts(300, 150), 400.0);
    }

    #[test]
    fn less_equal_minimisation_enumerates_all_optima() {
        let params = SolveParams {
            minimize: MinimizeMode::LessEqual,
            ..SolveParams::default()
        };
        assert!(params.enumerator_options().optimize_all);
        assert!(!SolveParams::default().enumerator_options().optimize_all);
    }
}
