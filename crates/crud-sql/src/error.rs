//! The errors a record service returns, and how engine failures map onto them.

use query_engine_execution as execution;
use query_engine_translation::translation;
use thiserror::Error;

/// A failed record operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid service configuration: {0}")]
    Configuration(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{0}")]
    UnsupportedOperator(String),
    #[error("{0}")]
    InvalidQuery(String),
    /// The storage engine rejected the data.
    #[error("{message}")]
    Validation {
        message: String,
        constraint: Option<String>,
    },
    #[error("{0}")]
    Storage(String),
}

impl Error {
    /// A short name for the kind of failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "Configuration",
            Error::NotFound(_) => "NotFound",
            Error::InvalidOperation(_) => "InvalidOperation",
            Error::UnsupportedOperator(_) => "UnsupportedOperator",
            Error::InvalidQuery(_) => "InvalidQuery",
            Error::Validation { .. } => "Validation",
            Error::Storage(_) => "Storage",
        }
    }
}

impl From<translation::error::Error> for Error {
    fn from(err: translation::error::Error) -> Error {
        match err {
            translation::error::Error::UnsupportedOperator(_)
            | translation::error::Error::OperatorNotSupportedForType { .. } => {
                Error::UnsupportedOperator(err.to_string())
            }
            translation::error::Error::InvalidDirective { .. }
            | translation::error::Error::InvalidOperand { .. }
            | translation::error::Error::UnsupportedValue(_) => Error::InvalidQuery(err.to_string()),
        }
    }
}

/// Map a storage engine failure onto the record service's errors.
pub fn normalize(err: execution::Error) -> Error {
    match err {
        execution::Error::RecordNotFound => Error::NotFound(err.to_string()),
        execution::Error::Constraint {
            message,
            constraint,
        } => Error::Validation {
            message,
            constraint,
        },
        execution::Error::Translation(err) => err.into(),
        execution::Error::DB(_) | execution::Error::Decode(_) | execution::Error::Engine(_) => {
            Error::Storage(err.to_string())
        }
    }
}
