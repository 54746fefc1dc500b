//! Metadata describing the tables the record services are bound to.

pub mod metadata;
