//! # Aspen
//! Aspen is an answer set solver built on conflict-driven clause learning. It reads ground logic
//! programs in the smodels format and propositional formulas in the DIMACS CNF format, and
//! enumerates their models, optimal models, or brave and cautious consequences.
//!
//! The search engine lives in [`aspen_core`], which is re-exported here as [`core`]. A logic
//! program is built with the [`ProgramBuilder`](program::ProgramBuilder):
//! ```rust
//! # use std::ops::ControlFlow;
//! # use aspen_solver::enumerators::Enumerator;
//! # use aspen_solver::enumerators::Model;
//! # use aspen_solver::program::ProgramBuilder;
//! # use aspen_solver::program::Rule;
//! # use aspen_solver::solve::solve;
//! # use aspen_solver::solve::SolveParams;
//! # use aspen_solver::termination::Indefinite;
//! # use aspen_solver::Solver;
//! // a :- not b.  b :- not a.
//! let mut program = ProgramBuilder::default();
//! program.add_rule(Rule::basic(1, &[], &[2])).expect("valid rule");
//! program.add_rule(Rule::basic(2, &[], &[1])).expect("valid rule");
//!
//! let mut solver = Solver::default();
//! assert!(program.end_program(&mut solver).expect("valid program"));
//! assert!(solver.end_add_constraints(false));
//!
//! let params = SolveParams {
//!     num_models: 0,
//!     ..SolveParams::default()
//! };
//! let mut enumerator = Enumerator::new(params.enumerator_options());
//! let mut handler = |_: &Solver, _: &Model| ControlFlow::Continue(());
//! let result = solve(
//!     &mut solver,
//!     &params,
//!     &mut enumerator,
//!     &mut handler,
//!     &mut Indefinite,
//! );
//! assert_eq!(result.models, 2);
//! ```
pub use aspen_core as core;
pub use aspen_core::*;
