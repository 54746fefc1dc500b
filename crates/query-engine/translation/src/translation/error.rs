//! Errors for query translation.

use query_engine_metadata::metadata::ScalarType;
use thiserror::Error;

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),
    #[error("operator '{operator}' is not supported on field '{field}' of type '{scalar_type}'")]
    OperatorNotSupportedForType {
        field: String,
        operator: String,
        scalar_type: ScalarType,
    },
    #[error("invalid value for '{directive}': {message}")]
    InvalidDirective { directive: String, message: String },
    #[error("invalid operand for '{operator}' on field '{field}': {message}")]
    InvalidOperand {
        field: String,
        operator: String,
        message: String,
    },
    #[error("values like {0} are not supported here")]
    UnsupportedValue(serde_json::Value),
}
