use enumset::EnumSet;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::engine::reason::AntecedentKind;
use crate::heuristics::HeuristicOptions;

/// How learnt conflict clauses are minimised before they are added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MinimizationStrategy {
    /// A literal is dropped if all literals of its reason are already in the clause.
    Beame,
    /// A literal is dropped if it is implied by the other literals of the clause, searching
    /// recursively through the implication graph.
    #[default]
    Een,
}

/// Which reasons may be used when minimising a conflict clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum AntecedentFilter {
    /// No minimisation.
    None,
    /// Only binary clauses.
    Binary,
    /// Binary and ternary clauses.
    BinaryTernary,
    /// All reasons.
    #[default]
    All,
}

impl AntecedentFilter {
    pub(crate) fn allowed(self) -> EnumSet<AntecedentKind> {
        match self {
            AntecedentFilter::None => EnumSet::empty(),
            AntecedentFilter::Binary => AntecedentKind::Binary.into(),
            AntecedentFilter::BinaryTernary => AntecedentKind::Binary | AntecedentKind::Ternary,
            AntecedentFilter::All => {
                AntecedentKind::Binary | AntecedentKind::Ternary | AntecedentKind::Other
            }
        }
    }
}

/// Options for the [`Solver`](crate::engine::Solver) which determine how it behaves.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Whether conflicts are resolved by learning clauses; without learning every conflict is
    /// resolved by flipping the most recent decision.
    pub learning: bool,
    pub minimization: MinimizationStrategy,
    pub antecedents: AntecedentFilter,
    /// Whether unassigned variables remember their last value, which is reused on the next
    /// decision.
    pub save_progress: bool,
    /// Whether constraints are shuffled before search starts.
    pub random_watches: bool,
    /// Learnt clauses longer than this get no activity and are the first ones removed when the
    /// learnt database is reduced; 0 disables the limit.
    pub compression: u32,
    pub heuristic: HeuristicOptions,
    /// Used for every randomised choice of the solver.
    pub random_generator: SmallRng,
}

impl SolverOptions {
    pub fn with_seed(seed: u64) -> SolverOptions {
        SolverOptions {
            random_generator: SmallRng::seed_from_u64(seed),
            ..SolverOptions::default()
        }
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            learning: true,
            minimization: MinimizationStrategy::default(),
            antecedents: AntecedentFilter::default(),
            save_progress: false,
            random_watches: false,
            compression: 0,
            heuristic: HeuristicOptions::default(),
            random_generator: SmallRng::seed_from_u64(42),
        }
    }
}
