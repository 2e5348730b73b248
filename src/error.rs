/// Error types for the three pipeline phases, plus the unified `Error`
/// surfaced by the `engine` entry points.
///
/// Runtime errors are a typed enum rather than bare strings because
/// `has(..)` must recognise exactly two of them — undefined variable and
/// missing property — and convert those (and only those) to `false`.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Syntax error [line {line}]: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Type error: {message}")]
pub struct TypeError {
    pub message: String,
}

impl TypeError {
    pub fn new(message: impl Into<String>) -> Self {
        TypeError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("Property '{0}' does not exist")]
    MissingProperty(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Runtime error: {0}")]
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    #[error("{0}")]
    Type(#[from] TypeError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "Syntax",
            Error::Type(_) => "Type",
            Error::Runtime(_) => "Runtime",
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Syntax(e) => Some(e.line),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::Syntax(e) => e.message.clone(),
            Error::Type(e) => e.message.clone(),
            Error::Runtime(e) => e.to_string(),
        }
    }
}
