//! Errors raised while running statements.

use query_engine_translation::translation;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Execution error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found")]
    RecordNotFound,
    /// The database rejected the data: a constraint was violated or a value was malformed.
    #[error("{message}")]
    Constraint {
        message: String,
        constraint: Option<String>,
    },
    #[error("{0}")]
    Translation(#[from] translation::error::Error),
    #[error("database error: {0}")]
    DB(sqlx::Error),
    #[error("unable to decode the result: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Engine(String),
}

// SQLSTATE classes of rejected data: 22 is data exception, 23 is integrity constraint violation.
const DATA_EXCEPTION_CLASS: &str = "22";
const INTEGRITY_CONSTRAINT_VIOLATION_CLASS: &str = "23";

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Error {
        if matches!(err, sqlx::Error::RowNotFound) {
            return Error::RecordNotFound;
        }
        match rejected_data(&err) {
            Some((message, constraint)) => Error::Constraint {
                message,
                constraint,
            },
            None => Error::DB(err),
        }
    }
}

/// The message and constraint name of a database error caused by the data it was given.
fn rejected_data(err: &sqlx::Error) -> Option<(String, Option<String>)> {
    let sqlx::Error::Database(db_error) = err else {
        return None;
    };
    let rejected = match db_error.kind() {
        ErrorKind::UniqueViolation
        | ErrorKind::ForeignKeyViolation
        | ErrorKind::NotNullViolation
        | ErrorKind::CheckViolation => true,
        _ => db_error.code().is_some_and(|code| {
            code.starts_with(DATA_EXCEPTION_CLASS)
                || code.starts_with(INTEGRITY_CONSTRAINT_VIOLATION_CLASS)
        }),
    };
    rejected.then(|| {
        (
            db_error.message().to_string(),
            db_error.constraint().map(ToString::to_string),
        )
    })
}
