//! The per-variable search state and the trail.
#![allow(clippy::double_parens, reason = "originates inside the bitfield macro")]

use bitfield_struct::bitfield;

use super::reason::Reason;
use super::variables::Literal;
use super::variables::Value;
use super::variables::Var;
use super::variables::VarKind;
use crate::aspen_assert_moderate;
use crate::aspen_assert_simple;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
struct VarFlags {
    #[bits(2)]
    value: Value,
    /// The value the variable had before it was last unassigned (progress saving).
    #[bits(2)]
    saved: Value,
    seen_positive: bool,
    seen_negative: bool,
    body: bool,
    eq: bool,
    frozen: bool,
    eliminated: bool,
    #[bits(6)]
    __: u8,
}

/// The value, level, reason and flags of every variable, together with the trail of assigned
/// literals.
///
/// The sentinel variable 0 is permanently true at level 0 and is not on the trail.
#[derive(Clone, Debug)]
pub struct Assignments {
    flags: KeyedVec<Var, VarFlags>,
    levels: KeyedVec<Var, u32>,
    reasons: KeyedVec<Var, Reason>,
    trail: Trail<Literal>,
    num_eliminated: u32,
}

impl Default for Assignments {
    fn default() -> Self {
        let mut assignments = Assignments {
            flags: KeyedVec::default(),
            levels: KeyedVec::default(),
            reasons: KeyedVec::default(),
            trail: Trail::default(),
            num_eliminated: 0,
        };
        let sentinel = assignments.new_var(VarKind::Atom);
        assignments.flags[sentinel] = VarFlags::new()
            .with_value(Value::True)
            .with_seen_positive(true)
            .with_frozen(true);
        assignments
    }
}

impl Assignments {
    pub(crate) fn new_var(&mut self, kind: VarKind) -> Var {
        let flags = VarFlags::new()
            .with_body(kind == VarKind::Body)
            .with_eq(kind == VarKind::AtomBody);
        let var = self.flags.push(flags);
        let _ = self.levels.push(0);
        let _ = self.reasons.push(Reason::Decision);
        var
    }

    /// The number of problem variables, not counting the sentinel.
    pub fn num_vars(&self) -> u32 {
        self.flags.len() as u32 - 1
    }

    pub fn is_valid(&self, var: Var) -> bool {
        var.id() <= self.num_vars()
    }

    /// Iterates over the problem variables `1..=num_vars`.
    pub fn vars(&self) -> impl Iterator<Item = Var> {
        (1..=self.num_vars()).map(Var::new)
    }

    pub fn num_assigned(&self) -> u32 {
        self.trail.len() as u32
    }

    pub fn num_free_vars(&self) -> u32 {
        self.num_vars() - self.num_assigned() - self.num_eliminated
    }

    pub fn num_eliminated(&self) -> u32 {
        self.num_eliminated
    }

    pub fn value(&self, var: Var) -> Value {
        self.flags[var].value()
    }

    pub fn is_free(&self, var: Var) -> bool {
        self.value(var) == Value::Free
    }

    pub fn is_true(&self, literal: Literal) -> bool {
        self.value(literal.var()) == Value::true_value(literal)
    }

    pub fn is_false(&self, literal: Literal) -> bool {
        self.value(literal.var()) == Value::true_value(!literal)
    }

    /// The value of a literal rather than of its variable.
    pub fn literal_value(&self, literal: Literal) -> Value {
        let value = self.value(literal.var());
        if literal.is_positive() {
            value
        } else {
            value.negate()
        }
    }

    pub fn level(&self, var: Var) -> u32 {
        self.levels[var]
    }

    pub fn reason(&self, var: Var) -> Reason {
        self.reasons[var]
    }

    pub fn kind(&self, var: Var) -> VarKind {
        let flags = self.flags[var];
        if flags.eq() {
            VarKind::AtomBody
        } else if flags.body() {
            VarKind::Body
        } else {
            VarKind::Atom
        }
    }

    pub(crate) fn set_kind(&mut self, var: Var, kind: VarKind) {
        let flags = &mut self.flags[var];
        flags.set_body(kind == VarKind::Body);
        flags.set_eq(kind == VarKind::AtomBody);
    }

    pub fn preferred_literal(&self, var: Var) -> Literal {
        self.kind(var).preferred_literal(var)
    }

    /// The value saved when the variable was last unassigned with progress saving enabled.
    pub fn saved_value(&self, var: Var) -> Value {
        self.flags[var].saved()
    }

    pub(crate) fn set_saved_value(&mut self, var: Var, value: Value) {
        self.flags[var].set_saved(value);
    }

    pub fn is_frozen(&self, var: Var) -> bool {
        self.flags[var].frozen()
    }

    pub(crate) fn set_frozen(&mut self, var: Var, frozen: bool) {
        self.flags[var].set_frozen(frozen);
    }

    pub fn is_eliminated(&self, var: Var) -> bool {
        self.flags[var].eliminated()
    }

    /// Eliminated variables are reported as true so that heuristics ignore them.
    pub(crate) fn set_eliminated(&mut self, var: Var, eliminated: bool) {
        let flags = &mut self.flags[var];
        if eliminated && !flags.eliminated() {
            aspen_assert_simple!(flags.value() == Value::Free, "cannot eliminate {var}");
            flags.set_eliminated(true);
            flags.set_value(Value::True);
            flags.set_seen_positive(true);
            self.num_eliminated += 1;
        } else if !eliminated && flags.eliminated() {
            flags.set_eliminated(false);
            flags.set_value(Value::Free);
            flags.set_seen_positive(false);
            self.num_eliminated -= 1;
        }
    }

    pub fn is_seen(&self, var: Var) -> bool {
        let flags = self.flags[var];
        flags.seen_positive() || flags.seen_negative()
    }

    pub fn is_literal_seen(&self, literal: Literal) -> bool {
        let flags = self.flags[literal.var()];
        if literal.is_positive() {
            flags.seen_positive()
        } else {
            flags.seen_negative()
        }
    }

    pub(crate) fn mark_seen(&mut self, literal: Literal) {
        let flags = &mut self.flags[literal.var()];
        if literal.is_positive() {
            flags.set_seen_positive(true);
        } else {
            flags.set_seen_negative(true);
        }
    }

    pub(crate) fn clear_seen(&mut self, var: Var) {
        let flags = &mut self.flags[var];
        flags.set_seen_positive(false);
        flags.set_seen_negative(false);
    }

    pub fn decision_level(&self) -> u32 {
        self.trail.decision_level()
    }

    /// The decision literal which opened `level` (`level > 0`).
    pub fn decision(&self, level: u32) -> Literal {
        aspen_assert_simple!(level > 0 && level <= self.decision_level());
        self.trail[self.trail.level_start(level)]
    }

    pub fn level_start(&self, level: u32) -> usize {
        self.trail.level_start(level)
    }

    pub fn trail(&self) -> &[Literal] {
        &self.trail
    }

    pub(crate) fn literals_at_level(&self, level: u32) -> &[Literal] {
        self.trail.values_at_level(level)
    }

    /// Makes `literal` true on the current level. The variable has to be free.
    pub(crate) fn assign(&mut self, literal: Literal, reason: Reason) {
        let var = literal.var();
        aspen_assert_moderate!(self.is_free(var), "{literal} is already assigned");

        self.flags[var].set_value(Value::true_value(literal));
        self.levels[var] = self.trail.decision_level();
        self.reasons[var] = reason;
        self.trail.push(literal);
    }

    pub(crate) fn new_decision_level(&mut self) {
        self.trail.new_level();
    }

    /// Frees every literal of the top level, in reverse trail order.
    pub(crate) fn undo_level(&mut self, save_phase: bool) {
        let Assignments {
            flags,
            reasons,
            trail,
            ..
        } = self;
        for literal in trail.pop_level() {
            let var_flags = &mut flags[literal.var()];
            if save_phase {
                var_flags.set_saved(var_flags.value());
            }
            var_flags.set_value(Value::Free);
            reasons[literal.var()] = Reason::Decision;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_true_and_not_counted() {
        let assignments = Assignments::default();

        assert_eq!(assignments.num_vars(), 0);
        assert!(assignments.is_true(Literal::TRUE));
        assert!(assignments.is_false(Literal::FALSE));
        assert_eq!(assignments.num_free_vars(), 0);
    }

    #[test]
    fn undoing_a_level_frees_its_variables_and_saves_phases() {
        let mut assignments = Assignments::default();
        let a = assignments.new_var(VarKind::Atom);
        let b = assignments.new_var(VarKind::Body);

        assignments.assign(Literal::positive(a), Reason::Decision);
        assignments.new_decision_level();
        assignments.assign(Literal::negative(b), Reason::Binary(Literal::positive(a)));

        assert_eq!(assignments.level(b), 1);
        assert_eq!(assignments.decision(1), Literal::negative(b));
        assert_eq!(assignments.num_free_vars(), 0);

        assignments.undo_level(true);

        assert!(assignments.is_free(b));
        assert!(assignments.is_true(Literal::positive(a)));
        assert_eq!(assignments.saved_value(b), Value::False);
        assert_eq!(assignments.reason(b), Reason::Decision);
        assert_eq!(assignments.decision_level(), 0);
    }

    #[test]
    fn kinds_and_preferred_literals() {
        let mut assignments = Assignments::default();
        let atom = assignments.new_var(VarKind::Atom);
        let body = assignments.new_var(VarKind::Body);
        let both = assignments.new_var(VarKind::AtomBody);

        assert_eq!(assignments.kind(both), VarKind::AtomBody);
        assert_eq!(assignments.preferred_literal(atom), Literal::negative(atom));
        assert_eq!(assignments.preferred_literal(body), Literal::positive(body));
    }

    #[test]
    fn eliminated_variables_are_not_free() {
        let mut assignments = Assignments::default();
        let a = assignments.new_var(VarKind::Atom);

        assignments.set_eliminated(a, true);
        assert!(!assignments.is_free(a));
        assert_eq!(assignments.num_free_vars(), 0);

        assignments.set_eliminated(a, false);
        assert!(assignments.is_free(a));
        assert_eq!(assignments.num_free_vars(), 1);
    }
}
