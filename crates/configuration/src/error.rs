//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use thiserror::Error;

/// The errors that can be thrown when parsing a configuration directory.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when writing a configuration directory.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("invalid configuration directory {0}: expected a directory")]
    DirectoryIsNotADirectory(PathBuf),
    #[error("unable to serialize configuration: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The errors that can be thrown when resolving a parsed configuration into its runtime form.
#[derive(Debug, Error)]
pub enum MakeRuntimeConfigurationError {
    #[error("invalid configuration: {message}")]
    MissingEnvironmentVariable {
        file_path: PathBuf,
        message: String,
    },
    #[error("service '{service}' refers to unknown table '{table}'")]
    UnknownTable { service: String, table: String },
    #[error("service '{service}' has a default page size of {default} above its maximum of {max}")]
    InvalidPagination {
        service: String,
        default: u32,
        max: u32,
    },
}
