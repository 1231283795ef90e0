//! A parser for ground logic programs in the numeric smodels format, as produced by lparse and
//! gringo. A program consists of four sections:
//!  - the rules, one per line, terminated by a line containing `0`,
//!  - the symbol table, `atom name` per line, terminated by `0`,
//!  - the compute statement, `B+` followed by the atoms which must be true and `B-` followed by
//!    the atoms which must be false, each list terminated by `0`,
//!  - the number of models to compute (0 for all).
//!
//! The supported rule types are basic (1), constraint (2), choice (3), weight (5) and minimize
//! (6) rules. Empty lines are skipped everywhere. Every error carries the line at which it was
//! detected.
use std::io::BufRead;
use std::io::BufReader;
use std::io::Lines;
use std::io::Read;
use std::str::FromStr;
use std::str::SplitWhitespace;

use aspen_solver::program::AtomLiteral;
use aspen_solver::program::ProgramBuilder;
use aspen_solver::program::Rule;
use aspen_solver::program::RuleKind;
use aspen_solver::ProgramError;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SmodelsParseError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: {source}")]
    Program { line: usize, source: ProgramError },
}

/// A program read from an smodels file.
#[derive(Debug)]
pub(crate) struct SmodelsInstance {
    pub(crate) program: ProgramBuilder,
    /// The number of models requested by the file; 0 requests all of them.
    pub(crate) num_models: u64,
}

pub(crate) fn parse_smodels(source: impl Read) -> Result<SmodelsInstance, SmodelsParseError> {
    let mut reader = SmodelsReader {
        lines: BufReader::new(source).lines(),
        line: 0,
        program: ProgramBuilder::default(),
    };

    reader.read_rules()?;
    reader.read_symbol_table()?;
    reader.read_compute_statement('+', true)?;
    reader.read_compute_statement('-', false)?;
    let num_models = reader.read_models()?;

    debug!(
        "Read a program with {} atoms and {} rules",
        reader.program.num_atoms(),
        reader.program.num_rules()
    );
    Ok(SmodelsInstance {
        program: reader.program,
        num_models,
    })
}

struct SmodelsReader<Source> {
    lines: Lines<Source>,
    /// The 1-based number of the line read last.
    line: usize,
    program: ProgramBuilder,
}

/// The whitespace separated tokens of one line.
struct Tokens<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
}

impl Tokens<'_> {
    fn next<Value: FromStr>(&mut self, expected: &str) -> Result<Value, SmodelsParseError> {
        self.tokens
            .next()
            .and_then(|token| token.parse::<Value>().ok())
            .ok_or_else(|| syntax_error(self.line, format!("{expected} expected")))
    }

    fn atom(&mut self) -> Result<u32, SmodelsParseError> {
        let atom = self.next::<u32>("Atom id")?;
        if atom == 0 {
            return Err(syntax_error(self.line, "Atom out of bounds"));
        }
        Ok(atom)
    }

    fn atoms(&mut self, count: usize) -> Result<Vec<u32>, SmodelsParseError> {
        (0..count).map(|_| self.atom()).collect()
    }

    fn end(&mut self, message: &str) -> Result<(), SmodelsParseError> {
        match self.tokens.next() {
            Some(_) => Err(syntax_error(self.line, message)),
            None => Ok(()),
        }
    }
}

impl<Source: BufRead> SmodelsReader<Source> {
    /// The next non-empty line, if any.
    fn next_line(&mut self) -> Result<Option<String>, SmodelsParseError> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line += 1;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn expect_line(&mut self, expected: &str) -> Result<String, SmodelsParseError> {
        self.next_line()?
            .ok_or_else(|| syntax_error(self.line + 1, format!("{expected} expected")))
    }

    fn read_rules(&mut self) -> Result<(), SmodelsParseError> {
        loop {
            let line = self.expect_line("Rule type")?;
            let mut tokens = Tokens {
                tokens: line.split_whitespace(),
                line: self.line,
            };
            let rule_type = tokens.next::<u32>("Rule type")?;
            if rule_type == 0 {
                return tokens.end("Symbol table expected");
            }

            let rule = read_rule(rule_type, &mut tokens)?;
            tokens.end("Illformed rule body")?;
            self.program
                .add_rule(rule)
                .map_err(|source| program_error(self.line, source))?;
        }
    }

    fn read_symbol_table(&mut self) -> Result<(), SmodelsParseError> {
        loop {
            let line = self.expect_line("Atom id")?;
            let line = line.trim();
            let (atom, name) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let atom = atom
                .parse::<u32>()
                .map_err(|_| syntax_error(self.line, "Symbol table: atom id expected"))?;
            if atom == 0 {
                if !name.trim().is_empty() {
                    return Err(syntax_error(self.line, "Compute statement expected"));
                }
                return Ok(());
            }
            let name = name.trim();
            if name.is_empty() {
                return Err(syntax_error(self.line, "Symbol table: atom name expected"));
            }
            self.program
                .set_atom_name(atom, name)
                .map_err(|source| program_error(self.line, source))?;
        }
    }

    fn read_compute_statement(&mut self, sign: char, value: bool) -> Result<(), SmodelsParseError> {
        let header = format!("B{sign}");
        let line = self.expect_line(&header)?;
        if line.trim() != header {
            return Err(syntax_error(self.line, format!("{header} expected")));
        }

        loop {
            let line = self.expect_line("Atom id or 0")?;
            let mut tokens = Tokens {
                tokens: line.split_whitespace(),
                line: self.line,
            };
            let atom = tokens.next::<u32>("Compute statement: atom id or 0")?;
            tokens.end("Newline expected")?;
            if atom == 0 {
                return Ok(());
            }
            self.program
                .set_compute(atom, value)
                .map_err(|source| program_error(self.line, source))?;
        }
    }

    fn read_models(&mut self) -> Result<u64, SmodelsParseError> {
        let line = self.expect_line("Number of models")?;
        let mut tokens = Tokens {
            tokens: line.split_whitespace(),
            line: self.line,
        };
        let num_models = tokens.next::<u64>("Number of models")?;
        tokens.end("End of file expected")?;
        Ok(num_models)
    }
}

/// Reads the rule of the given type from the remaining tokens of its line.
fn read_rule(rule_type: u32, tokens: &mut Tokens<'_>) -> Result<Rule, SmodelsParseError> {
    let kind =
        RuleKind::from_smodels(rule_type).map_err(|source| program_error(tokens.line, source))?;

    let mut bound = 0;
    let heads = match kind {
        RuleKind::Basic | RuleKind::Constraint => vec![tokens.atom()?],
        RuleKind::Weight => {
            let head = tokens.atom()?;
            bound = tokens.next::<i64>("Weight rule: bound")?;
            vec![head]
        }
        RuleKind::Choice => {
            let num_heads = tokens.next::<usize>("Choice rule: number of heads")?;
            if num_heads == 0 {
                return Err(syntax_error(tokens.line, "Choice rule: too few heads"));
            }
            tokens.atoms(num_heads)?
        }
        RuleKind::Optimize => {
            if tokens.next::<u32>("Minimize rule: 0")? != 0 {
                return Err(syntax_error(tokens.line, "Minimize rule: 0 expected"));
            }
            vec![]
        }
    };

    let num_literals = tokens.next::<usize>("Number of body literals")?;
    let num_negative = tokens.next::<usize>("Number of negative body literals")?;
    if num_negative > num_literals {
        return Err(syntax_error(tokens.line, "Illegal negative body size"));
    }
    if kind == RuleKind::Constraint {
        bound = tokens.next::<i64>("Constraint rule: bound")?;
    }
    if bound < 0 {
        return Err(syntax_error(tokens.line, "The bound must not be negative"));
    }

    let atoms = tokens.atoms(num_literals)?;
    let weights = if matches!(kind, RuleKind::Weight | RuleKind::Optimize) {
        (0..num_literals)
            .map(|_| tokens.next::<i64>("Weight"))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![1; num_literals]
    };

    let body = atoms
        .into_iter()
        .zip(weights)
        .enumerate()
        .map(|(index, (atom, weight))| {
            let literal = AtomLiteral {
                atom,
                positive: index >= num_negative,
            };
            (literal, weight)
        })
        .collect();

    Ok(Rule {
        kind,
        heads,
        body,
        bound,
    })
}

fn syntax_error(line: usize, message: impl Into<String>) -> SmodelsParseError {
    SmodelsParseError::Syntax {
        line,
        message: message.into(),
    }
}

fn program_error(line: usize, source: ProgramError) -> SmodelsParseError {
    SmodelsParseError::Program { line, source }
}
