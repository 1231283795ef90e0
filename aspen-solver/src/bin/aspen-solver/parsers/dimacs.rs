//! A parser for the DIMACS CNF file format. Given that DIMACS files can be very large, the
//! implementation reads the file in chunks and re-uses its buffers instead of allocating for
//! every clause.
//!
//! [`parse_cnf`] operates on a type that implements the [`DimacsSink`] trait, which serves as the
//! interface to the consumer of the parsed clauses.
//!
//! The parser is not meant to validate DIMACS files. Even though it only accepts valid files, the
//! errors are not very detailed.
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::num::NonZeroI32;
use std::str::FromStr;

use aspen_solver::variables::Literal;
use aspen_solver::variables::Var;
use aspen_solver::variables::VarKind;
use aspen_solver::Solver;
use aspen_solver::SolverOptions;
use log::debug;
use thiserror::Error;

/// A dimacs sink stores a set of clauses over the variables declared in the header.
pub(crate) trait DimacsSink {
    /// The arguments to the dimacs sink.
    type ConstructorArgs;

    /// The underlying formula type.
    type Formula;

    /// Create an empty formula.
    fn empty(args: Self::ConstructorArgs, num_variables: usize) -> Self;

    /// Add a clause to the formula. Consistency does not have to be checked at every insertion.
    fn add_clause(&mut self, clause: &[NonZeroI32]);

    /// Take the collected clauses and turn them into the underlying formula type.
    fn into_formula(self) -> Self::Formula;
}

#[derive(Debug, Error)]
pub(crate) enum DimacsParseError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),

    #[error("missing dimacs header")]
    MissingHeader,

    #[error("'{0}' is an invalid header")]
    InvalidHeader(String),

    #[error("multiple dimacs headers found")]
    DuplicateHeader,

    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    #[error("'{0}' is an invalid DIMACS literal")]
    InvalidLiteral(String),

    #[error("literal {literal} refers to a variable outside of the {num_variables} declared ones")]
    LiteralOutOfRange { literal: i32, num_variables: usize },

    #[error("the last clause in the source is not terminated with a '0'")]
    UnterminatedClause,

    #[error("expected to parse {expected} clauses, but parsed {parsed}")]
    IncorrectClauseCount { expected: usize, parsed: usize },
}

pub(crate) fn parse_cnf<Sink: DimacsSink>(
    source: impl Read,
    sink_constructor_args: Sink::ConstructorArgs,
) -> Result<Sink::Formula, DimacsParseError> {
    let mut reader = BufReader::new(source);
    let mut parser = DimacsParser::<Sink>::new(sink_constructor_args);

    loop {
        let num_bytes = {
            let data = reader.fill_buf()?;

            if data.is_empty() {
                return parser.complete();
            }

            parser.parse_chunk(data)?;
            data.len()
        };

        reader.consume(num_bytes);
    }
}

/// The core DIMACS parser, a state machine over the bytes of the source.
struct DimacsParser<Sink: DimacsSink> {
    sink_constructor_args: Option<Sink::ConstructorArgs>,
    sink: Option<Sink>,
    header: Option<CnfHeader>,
    buffer: String,
    clause: Vec<NonZeroI32>,
    state: ParseState,
    parsed_clauses: usize,
}

enum ParseState {
    StartLine,
    Header,
    Comment,
    Literal,
    NegativeLiteral,
    Clause,
}

impl<Sink: DimacsSink> DimacsParser<Sink> {
    fn new(sink_constructor_args: Sink::ConstructorArgs) -> Self {
        DimacsParser {
            sink_constructor_args: Some(sink_constructor_args),
            sink: None,
            header: None,
            buffer: String::new(),
            clause: vec![],
            state: ParseState::StartLine,
            parsed_clauses: 0,
        }
    }

    /// Parse the next chunk of bytes. This may start in the middle of parsing a clause or file
    /// header, and may end in such a state as well.
    fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), DimacsParseError> {
        for &byte in chunk {
            match self.state {
                ParseState::StartLine => match byte {
                    b if b.is_ascii_whitespace() => {}

                    b'p' => {
                        self.state = ParseState::Header;
                        self.buffer.clear();
                        self.buffer.push('p');
                    }

                    b'c' => self.state = ParseState::Comment,

                    b @ b'1'..=b'9' => self.start_literal(b, true),

                    // an empty clause
                    b'0' => self.finish_clause()?,

                    b'-' => self.start_literal(b'-', false),

                    b => return Err(DimacsParseError::UnexpectedCharacter(b as char)),
                },

                ParseState::Header => match byte {
                    b'\n' => {
                        self.init_formula()?;
                        self.state = ParseState::StartLine;
                    }

                    b => self.buffer.push(b as char),
                },

                ParseState::Comment => {
                    if byte == b'\n' {
                        self.state = ParseState::StartLine;
                    }
                }

                ParseState::Literal => match byte {
                    b if b.is_ascii_whitespace() => {
                        self.finish_literal()?;
                        if b == b'\n' {
                            self.state = ParseState::StartLine;
                        }
                    }

                    b @ b'0'..=b'9' => self.buffer.push(b as char),

                    b => return Err(DimacsParseError::UnexpectedCharacter(b as char)),
                },

                ParseState::NegativeLiteral => match byte {
                    b @ b'1'..=b'9' => {
                        self.buffer.push(b as char);
                        self.state = ParseState::Literal;
                    }

                    b => return Err(DimacsParseError::UnexpectedCharacter(b as char)),
                },

                ParseState::Clause => match byte {
                    b'0' => self.finish_clause()?,

                    // A new-line does not terminate the clause; the literals read so far are kept
                    // while comments and leading whitespace are handled by `StartLine`.
                    b'\n' => self.state = ParseState::StartLine,
                    b if b.is_ascii_whitespace() => {}

                    b @ b'1'..=b'9' => self.start_literal(b, true),
                    b'-' => self.start_literal(b'-', false),

                    b => return Err(DimacsParseError::UnexpectedCharacter(b as char)),
                },
            }
        }

        Ok(())
    }

    fn start_literal(&mut self, b: u8, is_positive: bool) {
        self.state = if is_positive {
            ParseState::Literal
        } else {
            ParseState::NegativeLiteral
        };

        self.buffer.clear();
        self.buffer.push(b as char);
    }

    fn complete(mut self) -> Result<Sink::Formula, DimacsParseError> {
        // the last literal may be followed directly by the end of the file
        if let ParseState::Literal = self.state {
            self.finish_literal()?;
        }
        let sink = self.sink.ok_or(DimacsParseError::MissingHeader)?;
        let expected = self
            .header
            .as_ref()
            .map_or(0, |header| header.num_clauses);

        if !self.clause.is_empty() {
            Err(DimacsParseError::UnterminatedClause)
        } else if expected != self.parsed_clauses {
            Err(DimacsParseError::IncorrectClauseCount {
                expected,
                parsed: self.parsed_clauses,
            })
        } else {
            Ok(sink.into_formula())
        }
    }

    fn init_formula(&mut self) -> Result<(), DimacsParseError> {
        let header = self.buffer.trim().parse::<CnfHeader>()?;

        self.sink = Some(Sink::empty(
            self.sink_constructor_args
                .take()
                .ok_or(DimacsParseError::DuplicateHeader)?,
            header.num_variables,
        ));
        debug!(
            "Reading {} clauses over {} variables",
            header.num_clauses, header.num_variables
        );
        self.header = Some(header);

        Ok(())
    }

    fn finish_literal(&mut self) -> Result<(), DimacsParseError> {
        let header = self.header.as_ref().ok_or(DimacsParseError::MissingHeader)?;
        let literal = self
            .buffer
            .parse::<i32>()
            .ok()
            .and_then(NonZeroI32::new)
            .ok_or_else(|| DimacsParseError::InvalidLiteral(self.buffer.clone()))?;
        if literal.unsigned_abs().get() as usize > header.num_variables {
            return Err(DimacsParseError::LiteralOutOfRange {
                literal: literal.get(),
                num_variables: header.num_variables,
            });
        }

        self.clause.push(literal);
        self.state = ParseState::Clause;

        Ok(())
    }

    fn finish_clause(&mut self) -> Result<(), DimacsParseError> {
        let sink = self.sink.as_mut().ok_or(DimacsParseError::MissingHeader)?;

        self.parsed_clauses += 1;
        sink.add_clause(&self.clause);
        self.clause.clear();

        Ok(())
    }
}

struct CnfHeader {
    num_variables: usize,
    num_clauses: usize,
}

impl FromStr for CnfHeader {
    type Err = DimacsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with("p cnf ") {
            return Err(DimacsParseError::InvalidHeader(s.to_owned()));
        }

        let mut components = s.split_whitespace().skip(2);

        let num_variables = next_header_component::<usize>(&mut components, s)?;
        let num_clauses = next_header_component::<usize>(&mut components, s)?;

        if components.next().is_some() {
            return Err(DimacsParseError::InvalidHeader(s.to_owned()));
        }

        Ok(Self {
            num_variables,
            num_clauses,
        })
    }
}

fn next_header_component<'a, Num: FromStr>(
    components: &mut impl Iterator<Item = &'a str>,
    header: &str,
) -> Result<Num, DimacsParseError> {
    components
        .next()
        .ok_or_else(|| DimacsParseError::InvalidHeader(header.to_owned()))?
        .parse::<Num>()
        .map_err(|_| DimacsParseError::InvalidHeader(header.to_owned()))
}

/// A formula read into a fresh [`Solver`], which still has to be initialised with
/// [`Solver::end_add_constraints`].
#[derive(Debug)]
pub(crate) struct DimacsInstance {
    pub(crate) solver: Solver,
    /// The variables of the file, in order; variable `i` of the file is `variables[i - 1]`.
    pub(crate) variables: Vec<Var>,
}

/// A dimacs sink that adds the clauses to a fresh [`Solver`].
///
/// Repeated literals are merged and tautologies dropped by [`Solver::add_clause`]; variables which
/// occur in no clause are fixed to false.
#[derive(Debug)]
pub(crate) struct SolverDimacsSink {
    solver: Solver,
    variables: Vec<Var>,
    occurs: Vec<bool>,
}

impl DimacsSink for SolverDimacsSink {
    type ConstructorArgs = SolverOptions;
    type Formula = DimacsInstance;

    fn empty(options: Self::ConstructorArgs, num_variables: usize) -> Self {
        let mut solver = Solver::new(options);
        solver.reserve_vars(num_variables as u32);
        let variables = (0..num_variables)
            .map(|_| solver.add_var(VarKind::Atom))
            .collect();
        solver.start_add_constraints();

        SolverDimacsSink {
            solver,
            variables,
            occurs: vec![false; num_variables],
        }
    }

    fn add_clause(&mut self, clause: &[NonZeroI32]) {
        let mapped = clause.iter().map(|dimacs_code| {
            let index = dimacs_code.unsigned_abs().get() as usize - 1;
            self.occurs[index] = true;
            Literal::new(self.variables[index], dimacs_code.get().is_positive())
        });

        // An empty or root-falsified clause leaves the solver infeasible, which is reported once
        // the search starts.
        let _ = self.solver.add_clause(mapped.collect::<Vec<_>>());
    }

    fn into_formula(mut self) -> Self::Formula {
        let unused = self
            .variables
            .iter()
            .zip(&self.occurs)
            .filter(|(_, occurs)| !**occurs)
            .map(|(&var, _)| var)
            .collect::<Vec<_>>();
        if !unused.is_empty() {
            debug!("Fixing {} variables which occur in no clause", unused.len());
        }
        for var in unused {
            let _ = self.solver.add_clause([Literal::negative(var)]);
        }

        DimacsInstance {
            solver: self.solver,
            variables: self.variables,
        }
    }
}
