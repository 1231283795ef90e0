//! Decision heuristics: strategies for choosing the literal the solver branches on.
//!
//! Every heuristic implements [`DecisionHeuristic`]; the solver stores the configured one as a
//! [`Heuristic`]. Failed-literal detection ([`Lookahead`]) can be put on top of every other
//! heuristic.
mod berkmin;
mod decayed_score;
mod decision_heuristic;
mod lookahead;
mod moms;
mod select_first;
mod select_random;
mod vmtf;
mod vsids;

pub use berkmin::Berkmin;
pub(crate) use decayed_score::DecayedScore;
pub use decision_heuristic::DecisionHeuristic;
pub use lookahead::Lookahead;
pub(crate) use moms::moms_score;
pub use select_first::SelectFirst;
pub use select_random::SelectRandom;
pub use vmtf::Vmtf;
pub use vsids::Vsids;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::engine::constraints::ConstraintKind;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::LookaheadState;
use crate::engine::Solver;

/// The available decision heuristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum HeuristicKind {
    /// The first free variable, in index order.
    First,
    /// A random free variable.
    Random,
    /// The variable whose literals derive the most consequences when probed.
    Lookahead,
    /// Literals of the most recent unsatisfied learnt clause, then the most active variable.
    #[default]
    Berkmin,
    /// The first free variable of a list in which recently active variables are moved to the
    /// front.
    Vmtf,
    /// The free variable with the highest activity.
    Vsids,
}

/// Which variables failed-literal detection probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LookaheadKind {
    /// Atoms, in both polarities.
    #[default]
    Atom,
    /// Bodies, in both polarities.
    Body,
    /// Atoms and bodies, only in their preferred polarity.
    Hybrid,
}

/// Configuration of the decision heuristic.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicOptions {
    pub kind: HeuristicKind,
    /// Failed-literal detection on top of `kind`. For [`HeuristicKind::Lookahead`] this selects
    /// the probed variables.
    pub lookahead: Option<LookaheadKind>,
    /// The number of decisions after which failed-literal detection is switched off; unlimited
    /// if [`None`].
    pub lookahead_budget: Option<u64>,
    /// Whether loop nogoods influence the activities of BerkMin and VMTF.
    pub loops: bool,
    /// The maximum number of learnt clauses BerkMin inspects per decision; 0 is unlimited.
    pub max_berkmin: u32,
    /// Seed of [`HeuristicKind::Random`].
    pub seed: u64,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        HeuristicOptions {
            kind: HeuristicKind::default(),
            lookahead: None,
            lookahead_budget: None,
            loops: true,
            max_berkmin: 0,
            seed: 42,
        }
    }
}

/// The heuristic used by the solver.
#[derive(Debug)]
pub enum Heuristic {
    First(SelectFirst),
    Random(SelectRandom),
    Lookahead(Lookahead),
    Vsids(Vsids),
    Berkmin(Berkmin),
    Vmtf(Vmtf),
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic::First(SelectFirst)
    }
}

impl Heuristic {
    pub fn new(options: &HeuristicOptions) -> Heuristic {
        let base = match options.kind {
            HeuristicKind::First => Heuristic::First(SelectFirst),
            HeuristicKind::Random => {
                Heuristic::Random(SelectRandom::new(SmallRng::seed_from_u64(options.seed)))
            }
            HeuristicKind::Lookahead => {
                return Heuristic::Lookahead(Lookahead::new(
                    options.lookahead.unwrap_or_default(),
                    None,
                    options.lookahead_budget,
                ));
            }
            HeuristicKind::Berkmin => {
                Heuristic::Berkmin(Berkmin::new(options.max_berkmin, options.loops))
            }
            HeuristicKind::Vmtf => Heuristic::Vmtf(Vmtf::new(options.loops)),
            HeuristicKind::Vsids => Heuristic::Vsids(Vsids::new(options.loops)),
        };
        match options.lookahead {
            Some(kind) => Heuristic::Lookahead(Lookahead::new(
                kind,
                Some(Box::new(base)),
                options.lookahead_budget,
            )),
            None => base,
        }
    }

    /// Takes the failed-literal detection state out of the heuristic, if failed-literal
    /// detection should run before the next decision.
    pub(crate) fn take_lookahead_state(&mut self) -> Option<LookaheadState> {
        match self {
            Heuristic::Lookahead(lookahead) => lookahead.take_state(),
            _ => None,
        }
    }

    pub(crate) fn restore_lookahead_state(&mut self, state: LookaheadState) {
        if let Heuristic::Lookahead(lookahead) = self {
            lookahead.restore_state(state);
        }
    }

    fn as_dyn(&mut self) -> &mut dyn DecisionHeuristic {
        match self {
            Heuristic::First(heuristic) => heuristic,
            Heuristic::Random(heuristic) => heuristic,
            Heuristic::Lookahead(heuristic) => heuristic,
            Heuristic::Vsids(heuristic) => heuristic,
            Heuristic::Berkmin(heuristic) => heuristic,
            Heuristic::Vmtf(heuristic) => heuristic,
        }
    }
}

impl DecisionHeuristic for Heuristic {
    fn start_init(&mut self, assignments: &Assignments) {
        self.as_dyn().start_init(assignments);
    }

    fn end_init(&mut self, solver: &Solver) {
        self.as_dyn().end_init(solver);
    }

    fn new_constraint(
        &mut self,
        assignments: &Assignments,
        literals: &[Literal],
        kind: ConstraintKind,
    ) {
        self.as_dyn().new_constraint(assignments, literals, kind);
    }

    fn update_reason(&mut self, reason: &[Literal], resolved: Option<Literal>) {
        self.as_dyn().update_reason(reason, resolved);
    }

    fn undo_until(&mut self, assignments: &Assignments, start: usize) {
        self.as_dyn().undo_until(assignments, start);
    }

    fn simplify(&mut self, assignments: &Assignments, start: usize) {
        self.as_dyn().simplify(assignments, start);
    }

    fn resurrect(&mut self, var: Var) {
        self.as_dyn().resurrect(var);
    }

    fn select(&mut self, solver: &Solver) -> Option<Literal> {
        self.as_dyn().select(solver)
    }
}

/// The first free variable in index order, for heuristics which ran out of candidates.
pub(crate) fn first_free_var(assignments: &Assignments) -> Option<Var> {
    assignments.vars().find(|&var| assignments.is_free(var))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::engine::variables::Literal;
    use crate::engine::variables::VarKind;
    use crate::engine::Solver;
    use crate::engine::SolverOptions;

    use super::HeuristicOptions;

    pub(crate) fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    /// A solver using the given heuristic, with the constraints added but not yet searched.
    pub(crate) fn solver(options: HeuristicOptions, num_vars: u32, clauses: &[&[i32]]) -> Solver {
        let mut solver = Solver::new(SolverOptions {
            heuristic: options,
            ..SolverOptions::default()
        });
        for _ in 0..num_vars {
            let _ = solver.add_var(VarKind::Atom);
        }
        solver.start_add_constraints();
        for clause in clauses {
            solver
                .add_clause(clause.iter().map(|&id| lit(id)))
                .expect("no root conflict");
        }
        assert!(solver.end_add_constraints(false));
        solver
    }
}
