//! Translates logic programs in the smodels rule format into constraints of the [`Solver`].
//!
//! Every atom and every body with more than one literal gets a variable. The Clark completion
//! links them: a body is equivalent to its literals (a conjunction, or a [`WeightConstraint`] for
//! cardinality and weight bodies), a body implies the heads of its non-choice rules, and an atom
//! implies the disjunction of its bodies. The completion alone admits models with positive
//! loops, so the atoms of cyclic components of the positive dependency graph are handed to the
//! [`UnfoundedCheck`]. Minimize statements become the [`MinimizeConstraint`], the statement read
//! last being the most significant.
//!
//! [`WeightConstraint`]: crate::engine::constraints::WeightConstraint
mod dependency_graph;
mod rule;
mod symbol_table;

use std::collections::hash_map::Entry;

use dependency_graph::DependencyGraph;
use log::debug;
pub use rule::AtomLiteral;
pub use rule::Rule;
pub use rule::RuleKind;
pub use symbol_table::SymbolTable;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::ProgramError;
use crate::basic_types::WeightedLiteral;
use crate::containers::HashMap;
use crate::engine::constraints::MinimizeConstraint;
use crate::engine::constraints::MinimizeMode;
use crate::engine::constraints::UfsBody;
use crate::engine::constraints::UnfoundedCheck;
use crate::engine::variables::Literal;
use crate::engine::variables::Var;
use crate::engine::variables::VarKind;
use crate::engine::Solver;

/// The largest atom; every atom needs a solver variable.
const MAX_ATOM: u32 = (u32::MAX >> 1) - 1;

/// The body of a rule after merging repeated literals.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Body {
    True,
    False,
    /// All literals hold.
    Conjunction(Vec<AtomLiteral>),
    /// The weights of the true literals reach the bound.
    Weighted {
        elements: Vec<(AtomLiteral, i64)>,
        bound: i64,
    },
}

impl Body {
    fn of(rule: &Rule) -> Body {
        if rule.kind.has_bound() {
            Body::weighted(&rule.body, rule.bound)
        } else {
            Body::conjunction(rule.body.iter().map(|&(literal, _)| literal).collect())
        }
    }

    fn conjunction(mut literals: Vec<AtomLiteral>) -> Body {
        literals.sort_unstable();
        literals.dedup();
        // Complementary literals are adjacent after sorting.
        if literals.windows(2).any(|pair| pair[0].atom == pair[1].atom) {
            return Body::False;
        }
        if literals.is_empty() {
            Body::True
        } else {
            Body::Conjunction(literals)
        }
    }

    fn weighted(body: &[(AtomLiteral, i64)], bound: i64) -> Body {
        let mut elements: Vec<(AtomLiteral, i64)> = vec![];
        let mut sorted = body.to_vec();
        sorted.sort_unstable();
        for (literal, weight) in sorted {
            match elements.last_mut() {
                Some((last, sum)) if *last == literal => *sum += weight,
                _ if weight == 0 => {}
                _ => elements.push((literal, weight)),
            }
        }

        if bound <= 0 {
            return Body::True;
        }
        let sum: i64 = elements.iter().map(|&(_, weight)| weight).sum();
        if sum < bound {
            return Body::False;
        }
        let min_weight = elements
            .iter()
            .map(|&(_, weight)| weight)
            .min()
            .unwrap_or(0);
        if sum - min_weight < bound {
            return Body::conjunction(elements.into_iter().map(|(literal, _)| literal).collect());
        }
        Body::Weighted { elements, bound }
    }

    fn positive_atoms(&self) -> Vec<(u32, i64)> {
        match self {
            Body::True | Body::False => vec![],
            Body::Conjunction(literals) => literals
                .iter()
                .filter(|literal| literal.positive)
                .map(|literal| (literal.atom, 1))
                .collect(),
            Body::Weighted { elements, .. } => elements
                .iter()
                .filter(|(literal, _)| literal.positive)
                .map(|&(literal, weight)| (literal.atom, weight))
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct AtomInfo {
    frozen: bool,
}

/// Collects the rules of a program and translates them into constraints of a [`Solver`].
///
/// Atoms are numbered from 1. They are created explicitly with [`ProgramBuilder::new_atom`] or
/// implicitly when a rule, a name or a compute statement mentions them.
#[derive(Clone, Debug)]
pub struct ProgramBuilder {
    /// Index 0 is unused.
    atoms: Vec<AtomInfo>,
    rules: Vec<Rule>,
    minimize: Vec<Vec<(AtomLiteral, i64)>>,
    computes: Vec<AtomLiteral>,
    symbols: SymbolTable,
    frozen: bool,
    /// The variable of every atom; filled by [`ProgramBuilder::end_program`].
    vars: Vec<Var>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        ProgramBuilder {
            atoms: vec![AtomInfo::default()],
            rules: vec![],
            minimize: vec![],
            computes: vec![],
            symbols: SymbolTable::default(),
            frozen: false,
            vars: vec![],
        }
    }
}

impl ProgramBuilder {
    /// Discards everything added so far and starts a new program.
    pub fn start_program(&mut self) {
        *self = ProgramBuilder::default();
    }

    pub fn new_atom(&mut self) -> Result<u32, ProgramError> {
        let atom = self.atoms.len() as u32;
        self.ensure_atom(atom)?;
        Ok(atom)
    }

    pub fn num_atoms(&self) -> u32 {
        self.atoms.len() as u32 - 1
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn set_atom_name(&mut self, atom: u32, name: impl Into<String>) -> Result<(), ProgramError> {
        self.check_not_frozen()?;
        self.ensure_atom(atom)?;
        self.symbols.set_name(atom, name);
        Ok(())
    }

    /// Forces `atom` to be true (`B+`) or false (`B-`) in every model.
    pub fn set_compute(&mut self, atom: u32, value: bool) -> Result<(), ProgramError> {
        self.check_not_frozen()?;
        self.ensure_atom(atom)?;
        self.computes.push(AtomLiteral {
            atom,
            positive: value,
        });
        Ok(())
    }

    /// Keeps the variable of `atom` from being eliminated.
    pub fn freeze(&mut self, atom: u32) -> Result<(), ProgramError> {
        self.check_not_frozen()?;
        self.ensure_atom(atom)?;
        self.atoms[atom as usize].frozen = true;
        Ok(())
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<(), ProgramError> {
        self.check_not_frozen()?;
        rule.validate()?;
        for atom in rule.atoms() {
            self.ensure_atom(atom)?;
        }
        if rule.kind == RuleKind::Optimize {
            self.minimize.push(rule.body);
        } else {
            self.rules.push(rule);
        }
        Ok(())
    }

    /// The variable of `atom`, once the program has been ended.
    pub fn atom_var(&self, atom: u32) -> Option<Var> {
        if atom == 0 {
            return None;
        }
        self.vars.get(atom as usize).copied()
    }

    /// The variables of the named atoms which are not hidden, with their names.
    pub fn visible_atoms(&self) -> Vec<(Var, String)> {
        self.symbols
            .visible()
            .filter_map(|(atom, name)| Some((self.atom_var(atom)?, name.to_owned())))
            .collect()
    }

    /// Adds the variables and constraints of the program to `solver`, which must not have been
    /// initialised yet. Afterwards the program cannot be changed; the caller finishes with
    /// [`Solver::end_add_constraints`].
    ///
    /// Returns `Ok(false)` if the program is found to have no answer set while its constraints
    /// are added.
    pub fn end_program(&mut self, solver: &mut Solver) -> Result<bool, ProgramError> {
        self.check_not_frozen()?;
        self.frozen = true;

        let num_atoms = self.num_atoms();
        solver.reserve_vars(num_atoms);
        self.vars = std::iter::once(Var::SENTINEL)
            .chain((1..=num_atoms).map(|_| solver.add_var(VarKind::Atom)))
            .collect();

        let bodies: Vec<Body> = self.rules.iter().map(Body::of).collect();
        let mut body_literals: HashMap<Body, Literal> = HashMap::default();
        let mut definitions: Vec<(Literal, Body)> = vec![];
        let mut rule_literals = Vec::with_capacity(bodies.len());
        for body in &bodies {
            let literal = match body {
                Body::True => Literal::TRUE,
                Body::False => Literal::FALSE,
                Body::Conjunction(literals) if literals.len() == 1 => self.literal(literals[0]),
                _ => match body_literals.entry(body.clone()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let literal = Literal::positive(solver.add_var(VarKind::Body));
                        definitions.push((literal, body.clone()));
                        *entry.insert(literal)
                    }
                },
            };
            rule_literals.push(literal);
        }
        debug!(
            "Program with {num_atoms} atoms, {} rules and {} distinct bodies",
            self.rules.len(),
            definitions.len()
        );

        solver.start_add_constraints();
        match self.add_constraints(solver, &bodies, &rule_literals, &definitions) {
            Ok(()) => Ok(true),
            Err(ConstraintOperationError::InfeasibleClause | ConstraintOperationError::InfeasibleState) => {
                debug!("The program is inconsistent");
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn add_constraints(
        &self,
        solver: &mut Solver,
        bodies: &[Body],
        rule_literals: &[Literal],
        definitions: &[(Literal, Body)],
    ) -> Result<(), ConstraintOperationError> {
        for (literal, body) in definitions {
            self.define_body(solver, *literal, body)?;
        }

        let mut supports: Vec<Vec<Literal>> = vec![vec![]; self.atoms.len()];
        for (rule, &body) in self.rules.iter().zip(rule_literals) {
            for &head in &rule.heads {
                if rule.kind != RuleKind::Choice {
                    solver.add_clause([!body, self.literal(AtomLiteral::positive(head))])?;
                }
                if body != Literal::FALSE {
                    supports[head as usize].push(body);
                }
            }
        }
        for (atom, bodies) in supports.into_iter().enumerate().skip(1) {
            let head = Literal::positive(self.vars[atom]);
            solver.add_clause(std::iter::once(!head).chain(bodies))?;
        }

        for &compute in &self.computes {
            solver.add_clause([self.literal(compute)])?;
        }

        if !self.minimize.is_empty() {
            let mut minimize = MinimizeConstraint::new(MinimizeMode::default());
            for statement in self.minimize.iter().rev() {
                minimize.add_rule(
                    statement
                        .iter()
                        .map(|&(literal, weight)| WeightedLiteral::new(self.literal(literal), weight)),
                );
            }
            solver.add_minimize(minimize)?;
        }

        for (atom, info) in self.atoms.iter().enumerate().skip(1) {
            if info.frozen {
                solver.freeze(self.vars[atom]);
            }
        }

        let check = self.unfounded_check(bodies, rule_literals);
        if !check.is_empty() {
            debug!("{} atoms are part of positive loops", check.num_atoms());
            solver.set_unfounded_check(check)?;
        }
        Ok(())
    }

    fn define_body(
        &self,
        solver: &mut Solver,
        literal: Literal,
        body: &Body,
    ) -> Result<(), ConstraintOperationError> {
        match body {
            Body::True => solver.add_clause([literal]),
            Body::False => solver.add_clause([!literal]),
            Body::Conjunction(literals) => {
                let literals: Vec<Literal> = literals.iter().map(|&l| self.literal(l)).collect();
                solver.add_clause(std::iter::once(literal).chain(literals.iter().map(|&l| !l)))?;
                for &element in &literals {
                    solver.add_clause([!literal, element])?;
                }
                Ok(())
            }
            Body::Weighted { elements, bound } => solver.add_weight_constraint(
                literal,
                elements
                    .iter()
                    .map(|&(element, weight)| WeightedLiteral::new(self.literal(element), weight)),
                *bound,
            ),
        }
    }

    /// The unfounded-set check over the cyclic components of the positive dependency graph.
    fn unfounded_check(&self, bodies: &[Body], rule_literals: &[Literal]) -> UnfoundedCheck {
        let mut graph = DependencyGraph::new(self.atoms.len());
        for (rule, body) in self.rules.iter().zip(bodies) {
            for (atom, _) in body.positive_atoms() {
                for &head in &rule.heads {
                    graph.add_edge(head, atom);
                }
            }
        }

        let mut check = UnfoundedCheck::default();
        // atom -> (component, index in the check)
        let mut cyclic: HashMap<u32, (u32, u32)> = HashMap::default();
        for (component, atoms) in graph.cyclic_components().into_iter().enumerate() {
            for atom in atoms {
                let index = check.add_atom(self.vars[atom as usize], component as u32);
                let _ = cyclic.insert(atom, (component as u32, index));
            }
        }
        if cyclic.is_empty() {
            return check;
        }

        let mut ufs_bodies: HashMap<(Literal, u32), u32> = HashMap::default();
        for ((rule, body), &literal) in self.rules.iter().zip(bodies).zip(rule_literals) {
            if *body == Body::False {
                continue;
            }
            for &head in &rule.heads {
                let Some(&(component, head_index)) = cyclic.get(&head) else {
                    continue;
                };
                let body_index = match ufs_bodies.entry((literal, component)) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let ufs_body = self.ufs_body(body, literal, component, &cyclic);
                        *entry.insert(check.add_body(ufs_body))
                    }
                };
                check.add_support(head_index, body_index);
            }
        }
        check
    }

    /// Splits a body into the atoms of `component` and the remaining literals.
    fn ufs_body(
        &self,
        body: &Body,
        literal: Literal,
        component: u32,
        cyclic: &HashMap<u32, (u32, u32)>,
    ) -> UfsBody {
        let internal_index = |element: AtomLiteral| {
            if !element.positive {
                return None;
            }
            cyclic
                .get(&element.atom)
                .filter(|&&(other, _)| other == component)
                .map(|&(_, index)| index)
        };

        let mut ufs_body = UfsBody {
            literal,
            internal: vec![],
            external: vec![],
            bound: None,
        };
        match body {
            Body::True | Body::False => {}
            Body::Conjunction(literals) => {
                ufs_body.internal = literals
                    .iter()
                    .filter_map(|&element| internal_index(element))
                    .map(|index| (index, 1))
                    .collect();
            }
            Body::Weighted { elements, bound } => {
                for &(element, weight) in elements {
                    match internal_index(element) {
                        Some(index) => ufs_body.internal.push((index, weight)),
                        None => ufs_body
                            .external
                            .push(WeightedLiteral::new(self.literal(element), weight)),
                    }
                }
                ufs_body.bound = Some(*bound);
            }
        }
        ufs_body
    }

    fn literal(&self, literal: AtomLiteral) -> Literal {
        Literal::new(self.vars[literal.atom as usize], literal.positive)
    }

    fn check_not_frozen(&self) -> Result<(), ProgramError> {
        if self.frozen {
            return Err(ProgramError::ProgramAlreadyFrozen);
        }
        Ok(())
    }

    fn ensure_atom(&mut self, atom: u32) -> Result<(), ProgramError> {
        if atom == 0 || atom > MAX_ATOM {
            return Err(ProgramError::AtomOutOfBounds(atom));
        }
        if self.atoms.len() <= atom as usize {
            self.atoms.resize(atom as usize + 1, AtomInfo::default());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use super::*;
    use crate::engine::termination::Indefinite;
    use crate::enumerators::Enumerator;
    use crate::enumerators::Model;
    use crate::solve::solve;
    use crate::solve::SolveOutcome;
    use crate::solve::SolveParams;

    /// Translates the program and returns the true atoms of every answer set, sorted.
    fn answer_sets(builder: &mut ProgramBuilder) -> Vec<Vec<u32>> {
        let mut solver = Solver::default();
        if !builder.end_program(&mut solver).expect("valid program")
            || !solver.end_add_constraints(false)
        {
            return vec![];
        }

        let params = SolveParams {
            num_models: 0,
            ..SolveParams::default()
        };
        let atoms: Vec<(u32, Var)> = (1..=builder.num_atoms())
            .filter_map(|atom| Some((atom, builder.atom_var(atom)?)))
            .collect();
        let mut answer_sets = vec![];
        let mut handler = |_: &Solver, model: &Model| {
            answer_sets.push(
                atoms
                    .iter()
                    .filter(|&&(_, var)| model.is_true(Literal::positive(var)))
                    .map(|&(atom, _)| atom)
                    .collect::<Vec<_>>(),
            );
            ControlFlow::Continue(())
        };
        let mut enumerator = Enumerator::new(params.enumerator_options());
        let _ = solve(
            &mut solver,
            &params,
            &mut enumerator,
            &mut handler,
            &mut Indefinite,
        );
        answer_sets.sort();
        answer_sets
    }

    fn program(rules: impl IntoIterator<Item = Rule>) -> ProgramBuilder {
        let mut builder = ProgramBuilder::default();
        for rule in rules {
            builder.add_rule(rule).expect("valid rule");
        }
        builder
    }

    #[test]
    fn even_negative_loop_has_two_answer_sets() {
        // a :- not b.  b :- not a.
        let mut builder = program([Rule::basic(1, &[], &[2]), Rule::basic(2, &[], &[1])]);
        assert_eq!(answer_sets(&mut builder), vec![vec![1], vec![2]]);
    }

    #[test]
    fn odd_negative_loop_has_no_answer_set() {
        // a :- not a.
        let mut builder = program([Rule::basic(1, &[], &[1])]);
        let mut solver = Solver::default();
        assert_eq!(builder.end_program(&mut solver), Ok(false));
    }

    #[test]
    fn positive_loops_are_unfounded() {
        // a :- b.  b :- a.
        let mut builder = program([Rule::basic(1, &[2], &[]), Rule::basic(2, &[1], &[])]);
        assert_eq!(answer_sets(&mut builder), vec![Vec::<u32>::new()]);
    }

    #[test]
    fn externally_supported_loops_are_founded() {
        // {c}.  a :- b.  b :- a.  a :- c.
        let mut builder = program([
            Rule::choice(&[3], &[], &[]),
            Rule::basic(1, &[2], &[]),
            Rule::basic(2, &[1], &[]),
            Rule::basic(1, &[3], &[]),
        ]);
        assert_eq!(answer_sets(&mut builder), vec![vec![], vec![1, 2, 3]]);
    }

    #[test]
    fn loops_through_weight_bodies_are_checked() {
        // {c}.  a :- 1 [b = 1, c = 1].  b :- a.
        let mut builder = program([
            Rule::choice(&[3], &[], &[]),
            Rule::weight(1, 1, &[(2, 1), (3, 1)], &[]),
            Rule::basic(2, &[1], &[]),
        ]);
        assert_eq!(answer_sets(&mut builder), vec![vec![], vec![1, 2, 3]]);
    }

    #[test]
    fn compute_statements_remove_answer_sets() {
        // a :- not b.  b :- not a.  with a false
        let mut builder = program([Rule::basic(1, &[], &[2]), Rule::basic(2, &[], &[1])]);
        builder.set_compute(1, false).expect("atom exists");
        assert_eq!(answer_sets(&mut builder), vec![vec![2]]);
    }

    #[test]
    fn weight_rules_hold_exactly_when_the_bound_is_reached() {
        // {a, b, c}.  h :- 2 [a = 1, b = 1, c = 2].
        let mut builder = program([
            Rule::choice(&[1, 2, 3], &[], &[]),
            Rule::weight(4, 2, &[(1, 1), (2, 1), (3, 2)], &[]),
        ]);
        let answer_sets = answer_sets(&mut builder);
        assert_eq!(answer_sets.len(), 8);
        for answer_set in answer_sets {
            let weight: i64 = answer_set
                .iter()
                .map(|&atom| match atom {
                    1 | 2 => 1,
                    3 => 2,
                    _ => 0,
                })
                .sum();
            assert_eq!(answer_set.contains(&4), weight >= 2, "{answer_set:?}");
        }
    }

    #[test]
    fn cardinality_rules_count_true_literals() {
        // {a, b}.  h :- 1 { a, not b }.
        let mut builder = program([
            Rule::choice(&[1, 2], &[], &[]),
            Rule::constraint(3, 1, &[1], &[2]),
        ]);
        assert_eq!(
            answer_sets(&mut builder),
            vec![vec![1, 2, 3], vec![1, 3], vec![2], vec![3]]
        );
    }

    #[test]
    fn the_last_minimize_statement_is_the_most_significant() {
        // {a, b}.  f :- not a, not b.  :- f.  minimize [a].  minimize [b].
        let mut builder = program([
            Rule::choice(&[1, 2], &[], &[]),
            Rule::basic(3, &[], &[1, 2]),
            Rule::optimize(&[(1, 1)], &[]),
            Rule::optimize(&[(2, 1)], &[]),
        ]);
        builder.set_compute(3, false).expect("atom exists");

        let mut solver = Solver::default();
        assert_eq!(builder.end_program(&mut solver), Ok(true));
        assert!(solver.end_add_constraints(false));

        let params = SolveParams::default();
        let mut best = None;
        let mut handler = |_: &Solver, model: &Model| {
            best = Some(model.clone());
            ControlFlow::Continue(())
        };
        let mut enumerator = Enumerator::new(params.enumerator_options());
        let result = solve(
            &mut solver,
            &params,
            &mut enumerator,
            &mut handler,
            &mut Indefinite,
        );

        assert_eq!(result.outcome, SolveOutcome::Optimal);
        let best = best.expect("the program has answer sets");
        assert_eq!(best.costs, Some(vec![0, 1]));
        assert!(best.is_true(Literal::positive(builder.atom_var(1).expect("translated"))));
    }

    #[test]
    fn names_select_the_visible_atoms() {
        let mut builder = program([Rule::choice(&[1, 2, 3], &[], &[])]);
        builder.set_atom_name(1, "a").expect("valid atom");
        builder.set_atom_name(2, "_hidden").expect("valid atom");
        let mut solver = Solver::default();
        assert_eq!(builder.end_program(&mut solver), Ok(true));

        let visible = builder.visible_atoms();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].1, "a");
        assert_eq!(Some(visible[0].0), builder.atom_var(1));
    }

    #[test]
    fn the_program_is_frozen_once_ended() {
        let mut builder = program([Rule::basic(1, &[], &[])]);
        assert_eq!(
            builder.add_rule(Rule::basic(0, &[], &[])),
            Err(ProgramError::AtomOutOfBounds(0))
        );

        let mut solver = Solver::default();
        assert_eq!(builder.end_program(&mut solver), Ok(true));
        assert_eq!(
            builder.add_rule(Rule::basic(2, &[], &[])),
            Err(ProgramError::ProgramAlreadyFrozen)
        );
        assert_eq!(
            builder.end_program(&mut solver),
            Err(ProgramError::ProgramAlreadyFrozen)
        );
    }
}
