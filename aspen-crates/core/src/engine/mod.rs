//! The search engine: variables and their assignment, the constraints and the watch lists
//! through which they propagate, and the [`Solver`] which ties them together.
pub(crate) mod assignments;
pub mod constraints;
pub(crate) mod reason;
pub(crate) mod solver;
pub(crate) mod solver_statistics;
pub mod termination;
pub mod variables;
pub(crate) mod watch_lists;

pub use assignments::Assignments;
pub use reason::Reason;
pub use solver::AntecedentFilter;
pub use solver::LookaheadState;
pub use solver::MinimizationStrategy;
pub use solver::SearchResult;
pub use solver::Solver;
pub use solver::SolverOptions;
pub use solver_statistics::ConstraintStatistics;
pub use solver_statistics::JumpStatistics;
pub use solver_statistics::SearchStatistics;
pub use solver_statistics::SolverStatistics;
pub use watch_lists::WatchLists;
