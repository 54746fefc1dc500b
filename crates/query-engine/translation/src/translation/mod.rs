//! Translate a caller's query filter into SQL to be run against the database.

pub mod error;
pub mod filter;
pub mod query;
