//! A weight constraint `con <-> sum(w_i * l_i) >= bound`.
//!
//! The constraint is handled as two counters. The [`Direction::FalseLiterals`] counter tracks how
//! much weight became false: once the bound cannot be reached anymore `con` is forced false, and if
//! `con` is true every literal without which the bound is unreachable is forced true. The
//! [`Direction::TrueLiterals`] counter does the same for the weight that became true. A
//! cardinality constraint is a weight constraint whose weights are all 1.
//!
//! For both directions the constraint is expressed in terms of a literal `side(i, d)` per index:
//! index 0 stands for the constraint literal and every other index for an element. An event of
//! direction `d` at index `i` means that `side(i, d)` became false; a force makes `side(i, d)`
//! true. Only one direction may force literals at a time; as long as it does, events of the other
//! direction are ignored since they cannot lead to further propagation.
use enum_map::Enum;
use enum_map::EnumMap;

use super::Constraint;
use super::PropagationContext;
use super::PropagationResult;
use crate::aspen_assert_moderate;
use crate::aspen_assert_simple;
use crate::basic_types::WeightedLiteral;
use crate::engine::assignments::Assignments;
use crate::engine::variables::Literal;
use crate::engine::variables::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Enum)]
enum Direction {
    FalseLiterals,
    TrueLiterals,
}

impl Direction {
    fn from_data(data: u32) -> Direction {
        if data & 1 == 0 {
            Direction::FalseLiterals
        } else {
            Direction::TrueLiterals
        }
    }

    fn encode(self, index: usize) -> u32 {
        ((index as u32) << 1) | self as u32
    }
}

#[derive(Clone, Copy, Debug)]
struct UndoEntry {
    index: u32,
    direction: Direction,
    /// `true` for a processed event, `false` for a literal forced by the constraint.
    processed: bool,
    level: u32,
}

#[derive(Clone, Debug)]
pub struct WeightConstraint {
    /// Position 0 holds the negation of the constraint literal; the other positions hold the
    /// elements by decreasing weight.
    literals: Vec<Literal>,
    weights: Vec<i64>,
    slack: EnumMap<Direction, i64>,
    body_processed: EnumMap<Direction, bool>,
    active: Option<Direction>,
    num_forced: u32,
    undo: Vec<UndoEntry>,
}

impl WeightConstraint {
    /// Creates the constraint from elements which are unassigned, have positive weights and do
    /// not repeat variables. The bound has to be positive and reachable.
    pub fn new(
        constraint_literal: Literal,
        mut elements: Vec<WeightedLiteral>,
        bound: i64,
    ) -> WeightConstraint {
        elements.sort_by(|a, b| b.weight.cmp(&a.weight));
        let sum: i64 = elements.iter().map(|element| element.weight).sum();
        aspen_assert_simple!(bound > 0 && bound <= sum);

        let mut literals = Vec::with_capacity(elements.len() + 1);
        let mut weights = Vec::with_capacity(elements.len() + 1);
        literals.push(!constraint_literal);
        weights.push(0);
        for element in elements {
            aspen_assert_simple!(element.weight > 0);
            literals.push(element.literal);
            weights.push(element.weight);
        }

        WeightConstraint {
            literals,
            weights,
            slack: EnumMap::from_array([sum - bound + 1, bound]),
            body_processed: EnumMap::default(),
            active: None,
            num_forced: 0,
            undo: vec![],
        }
    }

    pub fn constraint_literal(&self) -> Literal {
        !self.literals[0]
    }

    /// The number of elements, excluding the constraint literal.
    pub fn size(&self) -> usize {
        self.literals.len() - 1
    }

    /// Whether all weights are 1.
    pub fn is_cardinality(&self) -> bool {
        self.weights[1..].iter().all(|&weight| weight == 1)
    }

    fn side(&self, index: usize, direction: Direction) -> Literal {
        match direction {
            Direction::FalseLiterals => self.literals[index],
            Direction::TrueLiterals => !self.literals[index],
        }
    }

    /// The literals to watch, with the data to pass back when they become true.
    pub(crate) fn watches(&self) -> impl Iterator<Item = (Literal, u32)> + '_ {
        (0..self.literals.len()).flat_map(move |index| {
            [Direction::FalseLiterals, Direction::TrueLiterals]
                .into_iter()
                .map(move |direction| (!self.side(index, direction), direction.encode(index)))
        })
    }

    /// The watch event of the constraint literal which is currently true, if it is assigned.
    pub(crate) fn pending_body_event(&self, assignments: &Assignments) -> Option<(Literal, u32)> {
        let constraint_literal = self.constraint_literal();
        match assignments.literal_value(constraint_literal) {
            Value::True => Some((constraint_literal, Direction::FalseLiterals.encode(0))),
            Value::False => Some((!constraint_literal, Direction::TrueLiterals.encode(0))),
            Value::Free => None,
        }
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

    fn force_side(
        &mut self,
        context: &mut PropagationContext<'_>,
        index: usize,
        direction: Direction,
    ) -> bool {
        let literal = self.side(index, direction);
        if context.is_true(literal) {
            return true;
        }

        let level = context.decision_level();
        self.push_undo(
            context,
            UndoEntry {
                index: index as u32,
                direction,
                processed: false,
                level,
            },
        );
        self.num_forced += 1;
        self.active = Some(direction);
        context.force(literal)
    }
}

impl Constraint for WeightConstraint {
    fn propagate(
        &mut self,
        _literal: Literal,
        data: u32,
        context: &mut PropagationContext<'_>,
    ) -> PropagationResult {
        let index = (data >> 1) as usize;
        let direction = Direction::from_data(data);
        if self.active.is_some_and(|active| active != direction) {
            return PropagationResult::keep(true);
        }

        let level = context.decision_level();
        self.push_undo(
            context,
            UndoEntry {
                index: index as u32,
                direction,
                processed: true,
                level,
            },
        );
        if index == 0 {
            self.body_processed[direction] = true;
        } else {
            self.slack[direction] -= self.weights[index];
        }

        let slack = self.slack[direction];
        if slack <= 0 {
            return PropagationResult::keep(self.force_side(context, 0, direction));
        }

        if self.body_processed[direction] {
            for candidate in 1..self.literals.len() {
                if self.weights[candidate] < slack {
                    break;
                }
                if context.value(self.side(candidate, direction)) == Value::Free
                    && !self.force_side(context, candidate, direction)
                {
                    return PropagationResult::keep(false);
                }
            }
        }

        PropagationResult::keep(true)
    }

    fn reason(&self, literal: Literal, _assignments: &Assignments, reason: &mut Vec<Literal>) {
        let Some(position) = self.undo.iter().rposition(|entry| {
            !entry.processed && self.side(entry.index as usize, entry.direction) == literal
        }) else {
            aspen_assert_simple!(false, "{literal} was not forced by this weight constraint");
            return;
        };

        let forced = self.undo[position];
        let forced_body = forced.index == 0;
        reason.extend(
            self.undo[..position]
                .iter()
                .filter(|entry| {
                    entry.processed
                        && entry.direction == forced.direction
                        && !(forced_body && entry.index == 0)
                })
                .map(|entry| !self.side(entry.index as usize, entry.direction)),
        );
    }

    fn undo_level(&mut self, level: u32, _assignments: &Assignments) {
        while let Some(&entry) = self.undo.last() {
            if entry.level < level {
                break;
            }
            let _ = self.undo.pop();

            if entry.processed {
                if entry.index == 0 {
                    self.body_processed[entry.direction] = false;
                } else {
                    self.slack[entry.direction] += self.weights[entry.index as usize];
                }
            } else {
                aspen_assert_moderate!(self.num_forced > 0);
                self.num_forced -= 1;
                if self.num_forced == 0 {
                    self.active = None;
                }
            }
        }
    }

    fn simplify(&mut self, _assignments: &Assignments) -> bool {
        self.slack.values().any(|&slack| slack <= 0)
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

    /// Adds `x1 <-> sum(weights[i] * x(i + 2)) >= bound`.
    fn add(fixture: &mut ConstraintFixture, weights: &[i64], bound: i64) -> ConstraintRef {
        let elements = weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| WeightedLiteral::new(lit(index as i32 + 2), weight))
            .collect();
        let constraint = WeightConstraint::new(lit(1), elements, bound);
        let watches: Vec<_> = constraint.watches().collect();
        let handle = fixture.arena.insert(StoredConstraint::Weight(constraint));
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

    #[test]
    fn falsified_elements_force_the_constraint_literal_false() {
        let mut fixture = ConstraintFixture::new(4);
        let card = add(&mut fixture, &[1, 1, 1], 2);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(-2)));
        assert!(fixture.assignments.is_free(lit(1).var()));
        assert!(fixture.assign_and_propagate(lit(-3)));

        assert!(fixture.assignments.is_true(lit(-1)));
        assert_eq!(fixture.reason(card, lit(-1)), vec![lit(-2), lit(-3)]);
    }

    #[test]
    fn true_constraint_literal_forces_the_remaining_elements() {
        let mut fixture = ConstraintFixture::new(4);
        let card = add(&mut fixture, &[1, 1, 1], 2);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(1)));
        assert!(fixture.assign_and_propagate(lit(-2)));

        assert!(fixture.assignments.is_true(lit(3)));
        assert!(fixture.assignments.is_true(lit(4)));
        assert_eq!(fixture.reason(card, lit(4)), vec![lit(1), lit(-2)]);
    }

    #[test]
    fn reaching_the_bound_forces_the_constraint_literal_true() {
        let mut fixture = ConstraintFixture::new(4);
        let weight = add(&mut fixture, &[3, 2, 1], 4);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(4)));
        assert!(fixture.assignments.is_free(lit(1).var()));
        assert!(fixture.assign_and_propagate(lit(2)));

        assert!(fixture.assignments.is_true(lit(1)));
        assert_eq!(fixture.reason(weight, lit(1)), vec![lit(2), lit(4)]);
    }

    #[test]
    fn false_constraint_literal_forbids_heavy_elements() {
        let mut fixture = ConstraintFixture::new(4);
        let _ = add(&mut fixture, &[3, 2, 1], 4);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(-1)));
        assert!(fixture.assign_and_propagate(lit(4)));

        // 3 + 1 would reach the bound, 2 + 1 would not.
        assert!(fixture.assignments.is_true(lit(-2)));
        assert!(fixture.assignments.is_free(lit(3).var()));
    }

    #[test]
    fn undo_restores_the_counters() {
        let mut fixture = ConstraintFixture::new(4);
        let _ = add(&mut fixture, &[1, 1, 1], 2);

        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(-2)));
        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(-3)));
        assert!(fixture.assignments.is_true(lit(-1)));

        fixture.undo_level();
        assert!(fixture.assignments.is_free(lit(1).var()));
        fixture.new_level();
        assert!(fixture.assign_and_propagate(lit(3)));
        assert!(fixture.assign_and_propagate(lit(4)));
        assert!(fixture.assignments.is_true(lit(1)));
    }

    #[test]
    fn late_event_conflicts_with_the_constraint_literal() {
        let mut fixture = ConstraintFixture::new(4);
        let card = add(&mut fixture, &[1, 1, 1], 3);

        fixture.new_level();
        fixture
            .assignments
            .assign(lit(-2), crate::engine::reason::Reason::Decision);
        assert!(fixture.assign_and_propagate(lit(1)));
        assert!(fixture.assignments.is_true(lit(3)));

        let pending = fixture.watch_lists.list(lit(-2)).general[0];
        let result = fixture.propagate(pending.constraint, lit(-2), pending.data);

        assert!(!result.ok);
        let conflict = fixture.conflict.expect("a conflict was recorded");
        assert_eq!(conflict.literal, lit(-1));
        assert_eq!(fixture.reason(card, lit(-1)), vec![lit(-2)]);
    }
}
