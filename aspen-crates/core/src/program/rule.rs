use std::fmt::Display;

use crate::basic_types::ProgramError;

/// The rule types of the smodels format which are supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `h :- a1, ..., not b1, ...`
    Basic,
    /// `h :- l { a1, ..., not b1, ... }`: at least `l` of the body literals hold.
    Constraint,
    /// `{ h1, ..., hn } :- a1, ..., not b1, ...`
    Choice,
    /// `h :- l [ a1 = w1, ..., not b1 = v1, ... ]`: the weights of the true literals reach `l`.
    Weight,
    /// `minimize [ a1 = w1, ..., not b1 = v1, ... ]`
    Optimize,
}

impl RuleKind {
    /// The rule kind of an smodels rule type.
    pub fn from_smodels(rule_type: u32) -> Result<RuleKind, ProgramError> {
        match rule_type {
            1 => Ok(RuleKind::Basic),
            2 => Ok(RuleKind::Constraint),
            3 => Ok(RuleKind::Choice),
            5 => Ok(RuleKind::Weight),
            6 => Ok(RuleKind::Optimize),
            _ => Err(ProgramError::UnsupportedRuleType(rule_type)),
        }
    }

    /// Whether the body of the rule carries a lower bound.
    pub fn has_bound(self) -> bool {
        matches!(self, RuleKind::Constraint | RuleKind::Weight)
    }
}

/// An atom or its default negation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomLiteral {
    pub atom: u32,
    pub positive: bool,
}

impl AtomLiteral {
    pub fn positive(atom: u32) -> AtomLiteral {
        AtomLiteral {
            atom,
            positive: true,
        }
    }

    pub fn negative(atom: u32) -> AtomLiteral {
        AtomLiteral {
            atom,
            positive: false,
        }
    }

    pub fn complement(self) -> AtomLiteral {
        AtomLiteral {
            atom: self.atom,
            positive: !self.positive,
        }
    }
}

impl Display for AtomLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.positive {
            write!(f, "{}", self.atom)
        } else {
            write!(f, "not {}", self.atom)
        }
    }
}

/// A rule of a logic program. The body literals carry weights, which are 1 unless the rule is a
/// weight rule or a minimize statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub kind: RuleKind,
    pub heads: Vec<u32>,
    pub body: Vec<(AtomLiteral, i64)>,
    /// The lower bound of constraint and weight rules.
    pub bound: i64,
}

impl Rule {
    fn with_body(
        kind: RuleKind,
        heads: Vec<u32>,
        positive: impl IntoIterator<Item = (u32, i64)>,
        negative: impl IntoIterator<Item = (u32, i64)>,
        bound: i64,
    ) -> Rule {
        let body = negative
            .into_iter()
            .map(|(atom, weight)| (AtomLiteral::negative(atom), weight))
            .chain(
                positive
                    .into_iter()
                    .map(|(atom, weight)| (AtomLiteral::positive(atom), weight)),
            )
            .collect();
        Rule {
            kind,
            heads,
            body,
            bound,
        }
    }

    pub fn basic(head: u32, positive: &[u32], negative: &[u32]) -> Rule {
        Rule::with_body(
            RuleKind::Basic,
            vec![head],
            unit_weights(positive),
            unit_weights(negative),
            0,
        )
    }

    pub fn constraint(head: u32, bound: i64, positive: &[u32], negative: &[u32]) -> Rule {
        Rule::with_body(
            RuleKind::Constraint,
            vec![head],
            unit_weights(positive),
            unit_weights(negative),
            bound,
        )
    }

    pub fn choice(heads: &[u32], positive: &[u32], negative: &[u32]) -> Rule {
        Rule::with_body(
            RuleKind::Choice,
            heads.to_vec(),
            unit_weights(positive),
            unit_weights(negative),
            0,
        )
    }

    pub fn weight(head: u32, bound: i64, positive: &[(u32, i64)], negative: &[(u32, i64)]) -> Rule {
        Rule::with_body(
            RuleKind::Weight,
            vec![head],
            positive.iter().copied(),
            negative.iter().copied(),
            bound,
        )
    }

    pub fn optimize(positive: &[(u32, i64)], negative: &[(u32, i64)]) -> Rule {
        Rule::with_body(
            RuleKind::Optimize,
            vec![],
            positive.iter().copied(),
            negative.iter().copied(),
            0,
        )
    }

    /// Every atom mentioned by the rule.
    pub fn atoms(&self) -> impl Iterator<Item = u32> + '_ {
        self.heads
            .iter()
            .copied()
            .chain(self.body.iter().map(|(literal, _)| literal.atom))
    }

    /// Checks the shape of the rule and that its weights can be summed.
    pub(crate) fn validate(&self) -> Result<(), ProgramError> {
        match self.kind {
            RuleKind::Optimize if !self.heads.is_empty() => {
                return Err(ProgramError::InvalidRule(
                    "a minimize statement has no head".to_owned(),
                ));
            }
            RuleKind::Choice if self.heads.is_empty() => {
                return Err(ProgramError::InvalidRule(
                    "a choice rule needs at least one head".to_owned(),
                ));
            }
            RuleKind::Basic | RuleKind::Constraint | RuleKind::Weight if self.heads.len() != 1 => {
                return Err(ProgramError::InvalidRule(format!(
                    "a {:?} rule has exactly one head, got {}",
                    self.kind,
                    self.heads.len()
                )));
            }
            _ => {}
        }
        if self.kind.has_bound() && self.bound < 0 {
            return Err(ProgramError::InvalidRule(format!(
                "the bound of a {:?} rule must not be negative, got {}",
                self.kind, self.bound
            )));
        }

        let mut sum: i64 = 0;
        for &(_, weight) in &self.body {
            if weight < 0 {
                return Err(ProgramError::NegativeWeight(weight));
            }
            sum = sum
                .checked_add(weight)
                .ok_or(ProgramError::WeightOverflow)?;
        }
        Ok(())
    }
}

fn unit_weights(atoms: &[u32]) -> impl Iterator<Item = (u32, i64)> + '_ {
    atoms.iter().map(|&atom| (atom, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smodels_rule_types() {
        assert_eq!(RuleKind::from_smodels(3), Ok(RuleKind::Choice));
        assert_eq!(RuleKind::from_smodels(6), Ok(RuleKind::Optimize));
        assert_eq!(
            RuleKind::from_smodels(4),
            Err(ProgramError::UnsupportedRuleType(4))
        );
    }

    #[test]
    fn negative_literals_come_first() {
        let rule = Rule::basic(1, &[2], &[3]);
        assert_eq!(
            rule.body,
            vec![(AtomLiteral::negative(3), 1), (AtomLiteral::positive(2), 1)]
        );
    }

    #[test]
    fn malformed_rules_are_rejected() {
        assert_eq!(
            Rule::weight(1, 2, &[(2, -1)], &[]).validate(),
            Err(ProgramError::NegativeWeight(-1))
        );
        assert_eq!(
            Rule::weight(1, 2, &[(2, i64::MAX), (3, 1)], &[]).validate(),
            Err(ProgramError::WeightOverflow)
        );
        assert!(matches!(
            Rule::choice(&[], &[1], &[]).validate(),
            Err(ProgramError::InvalidRule(_))
        ));
        assert!(Rule::constraint(1, 1, &[2, 3], &[4]).validate().is_ok());
    }
}
