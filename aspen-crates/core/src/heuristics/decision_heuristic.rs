use crate::engine::constraints::ConstraintKind;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::Assignments;
use crate::engine::Solver;

/// A strategy for choosing the next decision literal.
///
/// Besides [`DecisionHeuristic::select`], the solver informs the heuristic about the events it
/// may base its choices on. Every hook has a default which ignores the event.
pub trait DecisionHeuristic {
    /// Called before the problem constraints are added.
    fn start_init(&mut self, _assignments: &Assignments) {}

    /// Called once all problem constraints were added and simplified on the root level.
    fn end_init(&mut self, _solver: &Solver) {}

    /// Called for every constraint which is added, problem constraints as well as learnt ones.
    fn new_constraint(
        &mut self,
        _assignments: &Assignments,
        _literals: &[Literal],
        _kind: ConstraintKind,
    ) {
    }

    /// Called during conflict analysis for every set of true literals which is resolved:
    /// first with the conflict itself, then with the reason of every resolved literal.
    fn update_reason(&mut self, _reason: &[Literal], _resolved: Option<Literal>) {}

    /// Called before the literals from trail position `start` onwards are unassigned.
    fn undo_until(&mut self, _assignments: &Assignments, _start: usize) {}

    /// Called after the literals from trail position `start` onwards became root-level facts.
    fn simplify(&mut self, _assignments: &Assignments, _start: usize) {}

    /// Called when an eliminated variable becomes part of the problem again.
    fn resurrect(&mut self, _var: Var) {}

    /// Returns a free literal to decide on, or [`None`] if every variable is assigned.
    ///
    /// The literal has to be free; the solver assigns it.
    fn select(&mut self, solver: &Solver) -> Option<Literal>;
}
