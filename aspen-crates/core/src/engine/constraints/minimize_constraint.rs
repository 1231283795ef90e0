//! A lexicographic minimize constraint over a sequence of weighted-literal rules.
//!
//! Rule 0 is the most significant. Before the first model is found the constraint only tracks the
//! sums; afterwards it prunes every assignment whose sums are not lexicographically below (or, for
//! [`MinimizeMode::LessEqual`], not above) the sums of the best model found so far.
use super::Constraint;
use super::PropagationContext;
use super::PropagationResult;
use crate::aspen_assert_moderate;
use crate::aspen_assert_simple;
use crate::basic_types::WeightedLiteral;
use crate::containers::HashMap;
use crate::engine::assignments::Assignments;
use crate::engine::variables::Literal;

/// Whether models have to be strictly better than the best one found so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MinimizeMode {
    /// Only strictly better models are accepted.
    #[default]
    Less,
    /// Models as good as the best one are accepted as well.
    LessEqual,
}

/// A distinct literal of the constraint and the rules it occurs in, by increasing rule index.
#[derive(Clone, Debug)]
struct Occurrence {
    literal: Literal,
    rules: Vec<(u32, i64)>,
}

impl Occurrence {
    fn first_rule(&self) -> u32 {
        self.rules[0].0
    }
}

#[derive(Clone, Copy, Debug)]
struct UndoEntry {
    occurrence: u32,
    /// The first rule of the occurrence for a true literal, the violated rule for a forced one.
    rule: u32,
    /// `true` if the literal became true, `false` if its negation was forced.
    positive: bool,
    level: u32,
}

#[derive(Clone, Debug)]
pub struct MinimizeConstraint {
    occurrences: Vec<Occurrence>,
    occurrence_of: HashMap<Literal, u32>,
    /// Per rule, the occurrences and their weights by decreasing weight.
    rules: Vec<Vec<(u32, i64)>>,
    sums: Vec<i64>,
    optimum: Vec<i64>,
    mode: MinimizeMode,
    undo: Vec<UndoEntry>,
}

impl MinimizeConstraint {
    pub fn new(mode: MinimizeMode) -> MinimizeConstraint {
        MinimizeConstraint {
            occurrences: vec![],
            occurrence_of: HashMap::default(),
            rules: vec![],
            sums: vec![],
            optimum: vec![],
            mode,
            undo: vec![],
        }
    }

    /// Adds a rule which is less significant than all rules added before. Elements with a weight
    /// of 0 are ignored; weights have to be non-negative.
    pub fn add_rule(&mut self, elements: impl IntoIterator<Item = WeightedLiteral>) {
        let rule = self.rules.len() as u32;
        let mut merged: Vec<(u32, i64)> = vec![];

        for element in elements {
            aspen_assert_simple!(element.weight >= 0);
            if element.weight == 0 {
                continue;
            }
            let occurrence = *self
                .occurrence_of
                .entry(element.literal)
                .or_insert_with(|| {
                    self.occurrences.push(Occurrence {
                        literal: element.literal,
                        rules: vec![],
                    });
                    self.occurrences.len() as u32 - 1
                });
            match merged.iter_mut().find(|(other, _)| *other == occurrence) {
                Some((_, weight)) => *weight += element.weight,
                None => merged.push((occurrence, element.weight)),
            }
        }

        for &(occurrence, weight) in &merged {
            self.occurrences[occurrence as usize]
                .rules
                .push((rule, weight));
        }
        merged.sort_by(|a, b| b.1.cmp(&a.1));
        self.rules.push(merged);
        self.sums.push(0);
        self.optimum.push(i64::MAX);
    }

    pub fn mode(&self) -> MinimizeMode {
        self.mode
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// The sums of the current assignment, most significant rule first.
    pub fn sums(&self) -> &[i64] {
        &self.sums
    }

    /// The sums of the best model found so far, if any.
    pub fn optimum(&self) -> Option<&[i64]> {
        self.has_optimum().then_some(&self.optimum[..])
    }

    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.occurrences.iter().map(|occurrence| occurrence.literal)
    }

    /// The literals to watch, with the data to pass back when they become true.
    pub(crate) fn watches(&self) -> impl Iterator<Item = (Literal, u32)> + '_ {
        self.occurrences
            .iter()
            .enumerate()
            .map(|(index, occurrence)| (occurrence.literal, index as u32))
    }

    fn has_optimum(&self) -> bool {
        self.optimum.first().is_some_and(|&first| first != i64::MAX)
    }

    /// The first rule at which the current sums exceed the optimum, if they are lexicographically
    /// above it.
    fn violated_rule(&self) -> Option<u32> {
        for (rule, (&sum, &optimum)) in self.sums.iter().zip(&self.optimum).enumerate() {
            if sum < optimum {
                return None;
            }
            if sum > optimum {
                return Some(rule as u32);
            }
        }
        None
    }

    /// The rule that would be violated if the literal of `occurrence` became true.
    fn violated_rule_with(&self, occurrence: u32) -> Option<u32> {
        let mut added = self.occurrences[occurrence as usize].rules.iter().peekable();
        for rule in 0..self.rules.len() {
            let addition = match added.peek() {
                Some(&&(added_rule, weight)) if added_rule as usize == rule => {
                    let _ = added.next();
                    weight
                }
                _ => 0,
            };
            let sum = self.sums[rule] + addition;
            if sum < self.optimum[rule] {
                return None;
            }
            if sum > self.optimum[rule] {
                return Some(rule as u32);
            }
        }
        None
    }

    fn push_undo(&mut self, context: &mut PropagationContext<'_>, entry: UndoEntry) {
        if self
            .undo
            .last()
            .is_none_or(|last| last.level < entry.level)
        {
            context.register_undo();
        }
        self.undo.push(entry);
    }

    fn add_to_sums(&mut self, occurrence: u32, sign: i64) {
        for &(rule, weight) in &self.occurrences[occurrence as usize].rules {
            self.sums[rule as usize] += sign * weight;
        }
    }

    /// Forces the literal of `occurrence` false because it would violate `rule`.
    fn force_false(
        &mut self,
        context: &mut PropagationContext<'_>,
        occurrence: u32,
        rule: u32,
    ) -> bool {
        let level = context.decision_level();
        self.push_undo(
            context,
            UndoEntry {
                occurrence,
                rule,
                positive: false,
                level,
            },
        );
        context.force(!self.occurrences[occurrence as usize].literal)
    }

    /// Forces false every free literal which would make the sums exceed the optimum.
    pub(crate) fn backpropagate(&mut self, context: &mut PropagationContext<'_>) -> bool {
        if !self.has_optimum() {
            return true;
        }

        if let Some(rule) = self.violated_rule() {
            // Blame the last true literal which contributes to the violated rule.
            let Some(last) = self
                .undo
                .iter()
                .rev()
                .find(|entry| entry.positive && entry.rule <= rule)
                .copied()
            else {
                aspen_assert_simple!(false, "the sums cannot exceed the optimum without literals");
                return false;
            };
            return self.force_false(context, last.occurrence, rule);
        }

        // All rules before the first one below its optimum are tight.
        let first_open = self
            .sums
            .iter()
            .zip(&self.optimum)
            .position(|(sum, optimum)| sum < optimum)
            .unwrap_or(self.rules.len().saturating_sub(1));

        for rule in 0..=first_open.min(self.rules.len().saturating_sub(1)) {
            let slack = self.optimum[rule] - self.sums[rule];
            for position in 0..self.rules[rule].len() {
                let (occurrence, weight) = self.rules[rule][position];
                if rule == first_open && weight < slack {
                    break;
                }
                let details = &self.occurrences[occurrence as usize];
                if details.first_rule() as usize != rule
                    || !context.assignments().is_free(details.literal.var())
                {
                    continue;
                }
                if let Some(violated) = self.violated_rule_with(occurrence) {
                    if !self.force_false(context, occurrence, violated) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Records the current (total) assignment as the best model and returns the lowest decision
    /// level which has to be undone to find a model that is accepted afterwards.
    pub(crate) fn set_model(&mut self, decision_level: u32) -> u32 {
        aspen_assert_moderate!(self.violated_rule().is_none());
        self.optimum.clone_from(&self.sums);
        match self.mode {
            MinimizeMode::Less => {
                if let Some(last) = self.optimum.last_mut() {
                    *last -= 1;
                }
                self.undo
                    .iter()
                    .rev()
                    .find(|entry| entry.positive)
                    .map_or(0, |entry| entry.level)
            }
            MinimizeMode::LessEqual => decision_level,
        }
    }

    /// Switches to `mode`. When switching from [`MinimizeMode::Less`] to
    /// [`MinimizeMode::LessEqual`] the optimum becomes the sums of the best model again, so models
    /// as good as the best one are accepted.
    pub(crate) fn set_mode(&mut self, mode: MinimizeMode) {
        if self.has_optimum() && self.mode != mode {
            if let Some(last) = self.optimum.last_mut() {
                match mode {
                    MinimizeMode::LessEqual => *last += 1,
                    MinimizeMode::Less => *last -= 1,
                }
            }
        }
        self.mode = mode;
    }

    /// The negation of a free literal of the constraint, scanning the least significant rule
    /// first.
    pub(crate) fn select(&self, assignments: &Assignments) -> Option<Literal> {
        self.rules.iter().rev().find_map(|rule| {
            rule.iter()
                .map(|&(occurrence, _)| self.occurrences[occurrence as usize].literal)
                .find(|literal| assignments.is_free(literal.var()))
                .map(|literal| !literal)
        })
    }
}

impl Constraint for MinimizeConstraint {
    fn propagate(
        &mut self,
        literal: Literal,
        data: u32,
        context: &mut PropagationContext<'_>,
    ) -> PropagationResult {
        let occurrence = data;
        aspen_assert_moderate!(self.occurrences[occurrence as usize].literal == literal);

        self.add_to_sums(occurrence, 1);
        if !self.has_optimum() {
            let level = context.decision_level();
            let rule = self.occurrences[occurrence as usize].first_rule();
            self.push_undo(
                context,
                UndoEntry {
                    occurrence,
                    rule,
                    positive: true,
                    level,
                },
            );
            return PropagationResult::keep(true);
        }

        if let Some(rule) = self.violated_rule() {
            // The literal itself is to blame: undo its contribution and report the conflict as
            // a failed attempt to force it false.
            self.add_to_sums(occurrence, -1);
            return PropagationResult::keep(self.force_false(context, occurrence, rule));
        }

        let level = context.decision_level();
        let rule = self.occurrences[occurrence as usize].first_rule();
        self.push_undo(
            context,
            UndoEntry {
                occurrence,
                rule,
                positive: true,
                level,
            },
        );
        PropagationResult::keep(self.backpropagate(context))
    }

    fn reason(&self, literal: Literal, _assignments: &Assignments, reason: &mut Vec<Literal>) {
        let Some(position) = self.undo.iter().rposition(|entry| {
            !entry.positive && !self.occurrences[entry.occurrence as usize].literal == literal
        }) else {
            aspen_assert_simple!(false, "{literal} was not forced by the minimize constraint");
            return;
        };

        let rule = self.undo[position].rule;
        reason.extend(
            self.undo[..position]
                .iter()
                .filter(|entry| entry.positive && entry.rule <= rule)
                .map(|entry| self.occurrences[entry.occurrence as usize].literal),
        );
    }

    fn undo_level(&mut self, level: u32, _assignments: &Assignments) {
        while let Some(&entry) = self.undo.last() {
            if entry.level < level {
                break;
            }
            let _ = self.undo.pop();
            if entry.positive {
                self.add_to_sums(entry.occurrence, -1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraints::testing::ConstraintFixture;
    use crate::engine::constraints::ConstraintRef;
    use crate::engine::constraints::StoredConstraint;
    use crate::engine::watch_lists::Watch;

    fn lit(id: i32) -> Literal {
        Literal::from_dimacs(id)
    }

    fn add(fixture: &mut ConstraintFixture, constraint: MinimizeConstraint) -> ConstraintRef {
        let watches: Vec<_> = constraint.watches().collect();
        let handle = fixture.arena.insert(StoredConstraint::Minimize(constraint));
        for (literal, data) in watches {
            fixture.watch_lists.add_watch(
                literal,
                Watch {
                    constraint: handle,
                    data,
                },
            );
        }
        handle
    }

    fn minimize(fixture: &mut ConstraintFixture, handle: ConstraintRef) -> &mut MinimizeConstraint {
        fixture
            .arena
            .get_mut(handle)
            .and_then(|c| c.as_minimize_mut())
            .unwrap()
    }

    fn rule(elements: &[(i32, i64)]) -> Vec<WeightedLiteral> {
        elements
            .iter()
            .map(|&(id, weight)| WeightedLiteral::new(lit(id), weight))
            .collect()
    }

    #[test]
    fn sums_are_tracked_and_restored() {
        let mut fixture = ConstraintFixture::new(3);
        let mut constraint = MinimizeConstraint::new(MinimizeMode::Less);
        constraint.add_rule(rule(&[(1, 2), (2, 3)]));
        constraint.add_rule(rule(&[(1, 1), (3, 4)]));
        let handle = add(&mut fixture, constraint);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        assert!(fixture.assign_and_propagate(lit(3)));
        assert_eq!(minimize(&mut fixture, handle).sums(), &[2, 5]);

        fixture.undo_level();
        assert_eq!(minimize(&mut fixture, handle).sums(), &[0, 0]);
    }

    #[test]
    fn literals_exceeding_the_optimum_are_forced_false() {
        let mut fixture = ConstraintFixture::new(3);
        let mut constraint = MinimizeConstraint::new(MinimizeMode::Less);
        constraint.add_rule(rule(&[(1, 1), (2, 1), (3, 1)]));
        let handle = add(&mut fixture, constraint);

        // A model with cost 2 at level 2.
        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(2)));
        fixture.assignments.assign(lit(-3), crate::engine::reason::Reason::Decision);
        let level = fixture.assignments.decision_level();
        assert_eq!(minimize(&mut fixture, handle).set_model(level), 2);

        fixture.undo_level();
        assert_eq!(minimize(&mut fixture, handle).sums(), &[1]);

        // With x1 true the optimum of 1 is reached: every other literal has to be false.
        let mut context = crate::engine::constraints::PropagationContext {
            assignments: &mut fixture.assignments,
            watch_lists: &mut fixture.watch_lists,
            undo_lists: &mut fixture.undo_lists,
            conflict: &mut fixture.conflict,
            constraint: handle,
        };
        let stored = fixture
            .arena
            .get_mut(handle)
            .and_then(|c| c.as_minimize_mut())
            .unwrap();
        assert!(stored.backpropagate(&mut context));
        assert!(fixture.assignments.is_true(lit(-2)));
        assert!(fixture.assignments.is_true(lit(-3)));
        assert_eq!(fixture.reason(handle, lit(-2)), vec![lit(1)]);
    }

    #[test]
    fn exceeding_literal_causes_a_conflict() {
        let mut fixture = ConstraintFixture::new(2);
        let mut constraint = MinimizeConstraint::new(MinimizeMode::Less);
        constraint.add_rule(rule(&[(1, 1), (2, 1)]));
        let handle = add(&mut fixture, constraint);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        fixture.assignments.assign(lit(-2), crate::engine::reason::Reason::Decision);
        let level = fixture.assignments.decision_level();
        assert_eq!(minimize(&mut fixture, handle).set_model(level), 1);
        fixture.undo_level();

        // The optimum is now 0; a true literal conflicts immediately.
        fixture.new_level();
        assert!(!fixture.assign_and_propagate(lit(2)));
        let conflict = fixture.conflict.expect("a conflict was recorded");
        assert_eq!(conflict.literal, lit(-2));
        assert_eq!(minimize(&mut fixture, handle).sums(), &[0]);
    }

    #[test]
    fn less_significant_rules_break_ties() {
        let mut fixture = ConstraintFixture::new(3);
        let mut constraint = MinimizeConstraint::new(MinimizeMode::LessEqual);
        constraint.add_rule(rule(&[(1, 1)]));
        constraint.add_rule(rule(&[(2, 1), (3, 5)]));
        let handle = add(&mut fixture, constraint);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        assert!(fixture.assign_and_propagate(lit(2)));
        fixture.assignments.assign(lit(-3), crate::engine::reason::Reason::Decision);
        assert_eq!(minimize(&mut fixture, handle).set_model(1), 1);
        assert_eq!(minimize(&mut fixture, handle).optimum(), Some(&[1, 1][..]));

        fixture.undo_level();
        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        // x1 makes the first rule tight; x3 would exceed the second one.
        assert!(fixture.assignments.is_true(lit(-3)));
        assert!(fixture.assignments.is_free(lit(2).var()));
    }
}
