//! A `Model` backed by a PostgreSQL table.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info_span, Instrument};

use query_engine_metadata::metadata::TableInfo;
use query_engine_sql::sql;
use query_engine_translation::translation::query::{self as translation, mutation, root, FindQuery};

use crate::error::Error;
use crate::model::{EngineOptions, FindAndCount, Model, Record};
use crate::query;

/// A transaction several operations can share. Whoever began it commits it.
pub type SharedTransaction = Arc<Mutex<sqlx::Transaction<'static, sqlx::Postgres>>>;

/// Options for operations on a `PostgresModel`.
#[derive(Clone, Default)]
pub struct PostgresOptions {
    /// Run every statement of the operation in this transaction instead of on the pool.
    pub transaction: Option<SharedTransaction>,
    /// Lock the rows read.
    pub lock: Option<sql::ast::RowLock>,
    pub order_by: Option<sql::ast::OrderBy>,
    pub limit: Option<sql::ast::Limit>,
    pub attributes: Option<Vec<sql::ast::ColumnName>>,
}

impl EngineOptions for PostgresOptions {
    fn apply(&self, query: FindQuery) -> FindQuery {
        FindQuery {
            where_: query.where_,
            order_by: self.order_by.clone().unwrap_or(query.order_by),
            limit: self.limit.clone().unwrap_or(query.limit),
            attributes: self.attributes.clone().or(query.attributes),
        }
    }
}

/// A table in a PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PostgresModel {
    pool: sqlx::PgPool,
    table: TableInfo,
}

impl PostgresModel {
    pub fn new(pool: sqlx::PgPool, table: TableInfo) -> Self {
        PostgresModel { pool, table }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Begin a transaction to pass along in `PostgresOptions`.
    pub async fn begin(&self) -> Result<SharedTransaction, Error> {
        let transaction = self.pool.begin().await?;
        Ok(Arc::new(Mutex::new(transaction)))
    }

    /// Commit a transaction once no operation holds it anymore.
    pub async fn commit(transaction: SharedTransaction) -> Result<(), Error> {
        let transaction = Arc::try_unwrap(transaction)
            .map_err(|_| Error::Engine("the transaction is still in use".to_string()))?;
        transaction.into_inner().commit().await?;
        Ok(())
    }

    /// The formatted SQL of a find and its query plan.
    pub async fn explain(
        &self,
        query: &FindQuery,
        options: &PostgresOptions,
    ) -> Result<(String, String), Error> {
        let statement = root::translate_find_and_count(&self.table, query, options.lock);
        match &options.transaction {
            Some(transaction) => {
                let mut transaction = transaction.lock().await;
                query::explain(&mut **transaction, &statement).await
            }
            None => query::explain(&self.pool, &statement).await,
        }
    }

    async fn fetch_json(
        &self,
        statement: &sql::ast::Statement,
        options: &PostgresOptions,
    ) -> Result<serde_json::Value, Error> {
        match &options.transaction {
            Some(transaction) => {
                let mut transaction = transaction.lock().await;
                query::fetch_json(&mut **transaction, statement).await
            }
            None => query::fetch_json(&self.pool, statement).await,
        }
    }

    async fn fetch_records(
        &self,
        statement: &sql::ast::Statement,
        options: &PostgresOptions,
    ) -> Result<Vec<Record>, Error> {
        let value = self.fetch_json(statement, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn execute(
        &self,
        statement: &sql::ast::Statement,
        options: &PostgresOptions,
    ) -> Result<u64, Error> {
        match &options.transaction {
            Some(transaction) => {
                let mut transaction = transaction.lock().await;
                query::execute(&mut **transaction, statement).await
            }
            None => query::execute(&self.pool, statement).await,
        }
    }
}

#[async_trait]
impl Model for PostgresModel {
    type Options = PostgresOptions;

    fn table(&self) -> &TableInfo {
        &self.table
    }

    async fn find_and_count(
        &self,
        query: &FindQuery,
        options: &PostgresOptions,
    ) -> Result<FindAndCount, Error> {
        let statement = root::translate_find_and_count(&self.table, query, options.lock);
        let value = self
            .fetch_json(&statement, options)
            .instrument(info_span!("Database request"))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn find_by_id(
        &self,
        id: &serde_json::Value,
        query: &FindQuery,
        options: &PostgresOptions,
    ) -> Result<Option<Record>, Error> {
        let query = query
            .clone()
            .constrained(translation::id_equals(&self.table, id)?);
        let statement = root::translate_find(&self.table, &query, options.lock);
        let records = self
            .fetch_records(&statement, options)
            .instrument(info_span!("Database request"))
            .await?;
        Ok(records.into_iter().next())
    }

    async fn create(&self, record: Record, options: &PostgresOptions) -> Result<Record, Error> {
        self.bulk_create(vec![record], options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Engine("the insert returned no rows".to_string()))
    }

    async fn bulk_create(
        &self,
        records: Vec<Record>,
        options: &PostgresOptions,
    ) -> Result<Vec<Record>, Error> {
        if records.is_empty() {
            return Ok(vec![]);
        }
        let statement = mutation::translate_insert(&self.table, &records)?;
        self.fetch_records(&statement, options)
            .instrument(info_span!("Database request"))
            .await
    }

    async fn update(
        &self,
        changes: Record,
        where_: &sql::ast::Where,
        options: &PostgresOptions,
    ) -> Result<u64, Error> {
        match mutation::translate_update(&self.table, &changes, where_)? {
            None => Ok(0),
            Some(statement) => {
                self.execute(&statement, options)
                    .instrument(info_span!("Database request"))
                    .await
            }
        }
    }

    async fn destroy(
        &self,
        where_: &sql::ast::Where,
        options: &PostgresOptions,
    ) -> Result<u64, Error> {
        let statement = mutation::translate_delete(&self.table, where_);
        self.execute(&statement, options)
            .instrument(info_span!("Database request"))
            .await
    }

    async fn update_instance(
        &self,
        instance: &Record,
        changes: Record,
        options: &PostgresOptions,
    ) -> Result<Record, Error> {
        let id = instance.get(&self.table.primary_key).ok_or_else(|| {
            Error::Engine(format!(
                "the record has no '{}' to update it by",
                self.table.primary_key
            ))
        })?;
        let where_ = sql::ast::Where(translation::id_equals(&self.table, id)?);
        match mutation::translate_update_returning(&self.table, &changes, &where_)? {
            None => Ok(instance.clone()),
            Some(statement) => self
                .fetch_records(&statement, options)
                .instrument(info_span!("Database request"))
                .await?
                .into_iter()
                .next()
                .ok_or(Error::RecordNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> sql::ast::ColumnName {
        sql::ast::ColumnName(name.to_string())
    }

    fn translated() -> FindQuery {
        FindQuery {
            where_: sql::ast::Where(sql::helpers::column("active")),
            order_by: sql::ast::OrderBy {
                elements: vec![sql::ast::OrderByElement {
                    target: sql::helpers::column("name"),
                    direction: sql::ast::OrderByDirection::Asc,
                }],
            },
            limit: sql::ast::Limit {
                limit: Some(10),
                offset: None,
            },
            attributes: Some(vec![column("name"), column("id")]),
        }
    }

    #[test]
    fn default_options_keep_the_translated_query() {
        assert_eq!(PostgresOptions::default().apply(translated()), translated());
        assert_eq!(().apply(translated()), translated());
    }

    #[test]
    fn options_override_everything_but_the_where_clause() {
        let options = PostgresOptions {
            order_by: Some(sql::helpers::empty_order_by()),
            limit: Some(sql::ast::Limit {
                limit: Some(1),
                offset: Some(5),
            }),
            attributes: Some(vec![column("id")]),
            ..PostgresOptions::default()
        };

        let query = options.apply(translated());

        assert_eq!(query.where_, translated().where_);
        assert_eq!(query.order_by, sql::helpers::empty_order_by());
        assert_eq!(
            query.limit,
            sql::ast::Limit {
                limit: Some(1),
                offset: Some(5),
            }
        );
        assert_eq!(query.attributes, Some(vec![column("id")]));
    }
}
