use std::fmt::Display;

use aspen_solver::ProgramError;
use thiserror::Error;

use crate::parsers::dimacs::DimacsParseError;
use crate::parsers::smodels::SmodelsParseError;

pub(crate) type AspenResult<T> = Result<T, AspenError>;

#[derive(Error, Debug)]
pub(crate) enum AspenError {
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("The file {0} is not supported.")]
    InvalidInstanceFile(String),
    #[error("The dimacs file was invalid, more details: {0}")]
    InvalidDimacs(#[from] DimacsParseError),
    #[error("The smodels file was invalid, more details: {0}")]
    InvalidSmodels(#[from] SmodelsParseError),
    #[error("The logic program could not be translated, more details: {0}")]
    Program(#[from] ProgramError),
}

impl AspenError {
    pub(crate) fn invalid_instance(path: impl Display) -> Self {
        Self::InvalidInstanceFile(format!("{path}"))
    }
}
