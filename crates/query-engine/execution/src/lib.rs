//! Run record queries and mutations against a storage engine.

pub mod error;
pub mod metrics;
pub mod model;
pub mod postgres;
pub mod query;

pub use error::Error;
pub use model::{EngineOptions, FindAndCount, Model, Record};
pub use postgres::{PostgresModel, PostgresOptions, SharedTransaction};
