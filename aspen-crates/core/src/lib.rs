//! # Aspen core
//! The conflict-driven search engine of the Aspen answer set solver.
//!
//! Problems are stated over Boolean variables: clauses, weight constraints and a lexicographic
//! minimize constraint are added to a [`Solver`], logic programs are translated into such
//! constraints by the [`ProgramBuilder`](program::ProgramBuilder). The solver searches by
//! conflict-driven clause learning; positive loops of logic programs are handled by an
//! unfounded-set check which learns loop nogoods.
//!
//! ```rust
//! # use std::ops::ControlFlow;
//! # use aspen_core::enumerators::Enumerator;
//! # use aspen_core::enumerators::Model;
//! # use aspen_core::solve::solve;
//! # use aspen_core::solve::SolveOutcome;
//! # use aspen_core::solve::SolveParams;
//! # use aspen_core::termination::Indefinite;
//! # use aspen_core::variables::Literal;
//! # use aspen_core::variables::VarKind;
//! # use aspen_core::Solver;
//! let mut solver = Solver::default();
//! let x = solver.add_var(VarKind::Atom);
//! let y = solver.add_var(VarKind::Atom);
//!
//! solver.start_add_constraints();
//! solver
//!     .add_clause([Literal::positive(x), Literal::positive(y)])
//!     .expect("the clause is satisfiable");
//! solver
//!     .add_clause([Literal::negative(x)])
//!     .expect("the clause is satisfiable");
//! assert!(solver.end_add_constraints(false));
//!
//! let params = SolveParams::default();
//! let mut enumerator = Enumerator::new(params.enumerator_options());
//! let mut handler = |_: &Solver, model: &Model| {
//!     assert!(model.is_true(Literal::positive(y)));
//!     ControlFlow::Continue(())
//! };
//! let result = solve(
//!     &mut solver,
//!     &params,
//!     &mut enumerator,
//!     &mut handler,
//!     &mut Indefinite,
//! );
//! assert_eq!(result.outcome, SolveOutcome::Satisfiable);
//! ```
pub mod asserts;
pub mod basic_types;
pub mod containers;
pub mod engine;
pub mod enumerators;
pub mod heuristics;
pub mod program;
pub mod solve;
pub mod statistics;

pub use convert_case;
pub use rand;

pub use crate::basic_types::ConstraintOperationError;
pub use crate::basic_types::ProgramError;
pub use crate::basic_types::Random;
pub use crate::basic_types::WeightedLiteral;
pub use crate::engine::constraints;
pub use crate::engine::termination;
pub use crate::engine::variables;
pub use crate::engine::Solver;
pub use crate::engine::SolverOptions;
pub use crate::heuristics::HeuristicKind;
pub use crate::heuristics::HeuristicOptions;
pub use crate::heuristics::LookaheadKind;
