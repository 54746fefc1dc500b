//! The calls a record service makes on a storage engine.

use async_trait::async_trait;
use serde::Deserialize;

use query_engine_metadata::metadata::TableInfo;
use query_engine_sql::sql;
use query_engine_translation::translation::query::FindQuery;

use super::error::Error;

pub use query_engine_translation::translation::query::mutation::Record;

/// A page of rows and the number of rows matching the query regardless of its limit and offset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FindAndCount {
    pub count: u64,
    pub rows: Vec<Record>,
}

/// Engine specific options a caller passes along with an operation.
pub trait EngineOptions {
    /// Override parts of a translated query. The where clause always stays as translated.
    fn apply(&self, query: FindQuery) -> FindQuery;
}

/// No options at all.
impl EngineOptions for () {
    fn apply(&self, query: FindQuery) -> FindQuery {
        query
    }
}

/// A table of records in a storage engine.
#[async_trait]
pub trait Model: Send + Sync {
    type Options: EngineOptions + Default + Send + Sync;

    fn table(&self) -> &TableInfo;

    async fn find_and_count(
        &self,
        query: &FindQuery,
        options: &Self::Options,
    ) -> Result<FindAndCount, Error>;

    /// The record with this id, if it also matches `query`.
    async fn find_by_id(
        &self,
        id: &serde_json::Value,
        query: &FindQuery,
        options: &Self::Options,
    ) -> Result<Option<Record>, Error>;

    async fn create(&self, record: Record, options: &Self::Options) -> Result<Record, Error>;

    async fn bulk_create(
        &self,
        records: Vec<Record>,
        options: &Self::Options,
    ) -> Result<Vec<Record>, Error>;

    /// Write `changes` to every record matching `where_`, returning how many there were.
    async fn update(
        &self,
        changes: Record,
        where_: &sql::ast::Where,
        options: &Self::Options,
    ) -> Result<u64, Error>;

    /// Delete every record matching `where_`, returning how many there were.
    async fn destroy(&self, where_: &sql::ast::Where, options: &Self::Options)
        -> Result<u64, Error>;

    /// Write `changes` to a record previously read, returning it as stored.
    async fn update_instance(
        &self,
        instance: &Record,
        changes: Record,
        options: &Self::Options,
    ) -> Result<Record, Error>;
}
