//! A record service: find, get, create, patch, update and remove records of one table.
//!
//! Every operation parses the caller's query filter, translates it to SQL parts, and hands
//! those to a storage engine through the `Model` trait. Operations on several records first
//! resolve the ids they affect, then write, then read the records back by those ids, so the
//! caller sees the records it changed even when they no longer match its filter.

use serde_json::Value;
use tracing::{info_span, Instrument};

use crud_sql_configuration::{Pagination, ServiceRuntimeConfiguration};
use query_engine_execution::metrics::{Metrics, Operation};
use query_engine_execution::{EngineOptions, Model, Record};
use query_engine_sql::sql;
use query_engine_translation::translation::filter::{self, NormalizedFilter, QueryFilter};
use query_engine_translation::translation::query::{self as translation, filtering, FindQuery};

use crate::error::{normalize, Error};
use crate::params::{FindResult, Page, Params, Payload};
use crate::projection;

pub const DEFAULT_ID_FIELD: &str = "id";

/// What a record service is built from.
pub struct ServiceOptions<M> {
    pub model: Option<M>,
    /// The field holding each record's id. Must be the table's primary key.
    pub id_field: String,
    pub paginate: Pagination,
}

impl<M> Default for ServiceOptions<M> {
    fn default() -> Self {
        ServiceOptions {
            model: None,
            id_field: DEFAULT_ID_FIELD.to_string(),
            paginate: Pagination::disabled(),
        }
    }
}

impl<M: Model> ServiceOptions<M> {
    /// A service over `model`, keyed by the table's primary key, without paging.
    pub fn new(model: M) -> Self {
        let id_field = model.table().primary_key.clone();
        ServiceOptions {
            model: Some(model),
            id_field,
            paginate: Pagination::disabled(),
        }
    }

    /// A service over `model` as configured.
    pub fn from_configuration(model: M, service: &ServiceRuntimeConfiguration) -> Self {
        ServiceOptions {
            model: Some(model),
            id_field: service.table.primary_key.clone(),
            paginate: service.paginate,
        }
    }
}

impl<M> ServiceOptions<M> {
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    #[must_use]
    pub fn with_paginate(mut self, paginate: Pagination) -> Self {
        self.paginate = paginate;
        self
    }
}

/// The records of one table.
pub struct RecordService<M> {
    model: M,
    id_field: String,
    paginate: Pagination,
    metrics: Option<Metrics>,
}

impl<M: Model> RecordService<M> {
    pub fn new(options: ServiceOptions<M>) -> Result<Self, Error> {
        let model = options
            .model
            .ok_or_else(|| Error::Configuration("a model must be provided".to_string()))?;

        if options.id_field.is_empty() {
            return Err(Error::Configuration(
                "the id field must not be empty".to_string(),
            ));
        }
        let primary_key = &model.table().primary_key;
        if *primary_key != options.id_field {
            return Err(Error::Configuration(format!(
                "the id field '{}' is not the primary key '{primary_key}' of table '{}'",
                options.id_field,
                model.table().table_name
            )));
        }
        if let Pagination {
            default: Some(default),
            max: Some(max),
        } = options.paginate
        {
            if default > max {
                return Err(Error::Configuration(format!(
                    "the default page size {default} is above the maximum of {max}"
                )));
            }
        }

        Ok(RecordService {
            model,
            id_field: options.id_field,
            paginate: options.paginate,
            metrics: None,
        })
    }

    /// Count operations and failures in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn paginate(&self) -> Pagination {
        self.paginate
    }

    /// The records matching the query: a page when paginated, a list otherwise.
    pub async fn find(&self, params: &Params<M::Options>) -> Result<FindResult, Error> {
        let result = self.find_page(params).instrument(info_span!("Find")).await;
        self.observe(Operation::Find, result)
    }

    /// The record with this id, if it also matches the query.
    pub async fn get(&self, id: &Value, params: &Params<M::Options>) -> Result<Record, Error> {
        let result = self.get_one(id, params).instrument(info_span!("Get")).await;
        self.observe(Operation::Get, result)
    }

    /// Create one record, or several from a list. Several records come back as stored,
    /// without `$select` applied.
    pub async fn create(
        &self,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        let result = self
            .create_records(data, params)
            .instrument(info_span!("Create"))
            .await;
        self.observe(Operation::Create, result)
    }

    /// Merge `data` into the record with this id, or into every record matching the query.
    pub async fn patch(
        &self,
        id: Option<&Value>,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        let result = self
            .patch_records(id, data, params)
            .instrument(info_span!("Patch"))
            .await;
        self.observe(Operation::Patch, result)
    }

    /// Replace the record with this id. Fields missing from `data` are cleared.
    pub async fn update(
        &self,
        id: &Value,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Record, Error> {
        let result = self
            .update_record(id, data, params)
            .instrument(info_span!("Update"))
            .await;
        self.observe(Operation::Update, result)
    }

    /// Delete the record with this id, or every record matching the query. Returns what was
    /// deleted.
    pub async fn remove(
        &self,
        id: Option<&Value>,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        let result = self
            .remove_records(id, params)
            .instrument(info_span!("Remove"))
            .await;
        self.observe(Operation::Remove, result)
    }

    async fn find_page(&self, params: &Params<M::Options>) -> Result<FindResult, Error> {
        let paginate = params.paginate.unwrap_or(self.paginate);
        let filter = self.parse(&params.query, &paginate)?;
        let query = self.translate(&filter, &params.options)?;

        let found = self
            .model
            .find_and_count(&query, &params.options)
            .await
            .map_err(normalize)?;
        let data = projection::select_all(found.rows, &self.id_field, filter.select.as_deref());

        if paginate.is_enabled() {
            Ok(FindResult::Page(Page {
                total: found.count,
                limit: query.limit.limit,
                skip: query.limit.offset.unwrap_or(0),
                data,
            }))
        } else {
            Ok(FindResult::Records(data))
        }
    }

    async fn get_one(&self, id: &Value, params: &Params<M::Options>) -> Result<Record, Error> {
        let filter = self.parse(&params.query, &Pagination::disabled())?;
        let query = self.translate_one(&filter, &params.options)?;

        let record = self
            .model
            .find_by_id(id, &query, &params.options)
            .await
            .map_err(normalize)?
            .ok_or_else(|| not_found(id))?;
        Ok(projection::select(
            record,
            &self.id_field,
            filter.select.as_deref(),
        ))
    }

    /// The record with this id, or every record matching the query.
    async fn get_or_find(
        &self,
        id: Option<&Value>,
        params: &Params<M::Options>,
    ) -> Result<Vec<Record>, Error> {
        match id {
            Some(id) => Ok(vec![self.get_one(id, params).await?]),
            None => {
                let filter = self.parse(&params.query, &Pagination::disabled())?;
                self.find_all(&unpaged(filter), &params.options).await
            }
        }
    }

    async fn find_all(
        &self,
        filter: &NormalizedFilter,
        options: &M::Options,
    ) -> Result<Vec<Record>, Error> {
        let query = self.translate(filter, options)?;
        let found = self
            .model
            .find_and_count(&query, options)
            .await
            .map_err(normalize)?;
        Ok(projection::select_all(
            found.rows,
            &self.id_field,
            filter.select.as_deref(),
        ))
    }

    async fn create_records(
        &self,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        match data {
            Payload::One(record) => {
                let select = self.selected_fields(&params.query)?;
                let created = self
                    .model
                    .create(record, &params.options)
                    .await
                    .map_err(normalize)?;
                Ok(Payload::One(projection::select(
                    created,
                    &self.id_field,
                    select.as_deref(),
                )))
            }
            Payload::Many(records) => {
                let created = self
                    .model
                    .bulk_create(records, &params.options)
                    .await
                    .map_err(normalize)?;
                Ok(Payload::Many(created))
            }
        }
    }

    async fn patch_records(
        &self,
        id: Option<&Value>,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        let Payload::One(mut changes) = data else {
            return Err(Error::InvalidOperation(
                "patch takes a single object of changes, not a list".to_string(),
            ));
        };
        let filter = self.parse(&params.query, &Pagination::disabled())?;

        let ids: Vec<Value> = match id {
            Some(id) => vec![id.clone()],
            None => {
                let snapshot = NormalizedFilter {
                    select: Some(vec![self.id_field.clone()]),
                    ..unpaged(filter.clone())
                };
                self.find_all(&snapshot, &params.options)
                    .await?
                    .into_iter()
                    .filter_map(|mut record| record.remove(&self.id_field))
                    .collect()
            }
        };

        let where_ = self.write_where(&filter, id)?;
        changes.remove(&self.id_field);
        let patched = self
            .model
            .update(changes, &where_, &params.options)
            .await
            .map_err(normalize)?;
        tracing::debug!(patched, ids = ids.len(), "patched records");

        // read back by id: patched records may no longer match the query
        let refetch = NormalizedFilter {
            select: filter.select.clone(),
            ..NormalizedFilter::default()
        };
        let query = self
            .translate(&refetch, &params.options)?
            .constrained(translation::id_in(self.model.table(), &ids)?);
        let records = self.find_records(&query, &params.options).await?;
        let records = projection::select_all(records, &self.id_field, filter.select.as_deref());

        match id {
            Some(id) => records
                .into_iter()
                .next()
                .map(Payload::One)
                .ok_or_else(|| not_found(id)),
            None => Ok(Payload::Many(records)),
        }
    }

    async fn update_record(
        &self,
        id: &Value,
        data: Payload,
        params: &Params<M::Options>,
    ) -> Result<Record, Error> {
        let Payload::One(data) = data else {
            return Err(Error::InvalidOperation(
                "update replaces a single record, use patch to change several".to_string(),
            ));
        };
        let filter = self.parse(&params.query, &Pagination::disabled())?;

        // the whole record, whatever the caller selected
        let current_filter = NormalizedFilter {
            select: None,
            ..filter.clone()
        };
        let query = self.translate_one(&current_filter, &params.options)?;
        let current = self
            .model
            .find_by_id(id, &query, &params.options)
            .await
            .map_err(normalize)?
            .ok_or_else(|| not_found(id))?;

        let replacement: Record = current
            .keys()
            .filter(|field| **field != self.id_field)
            .map(|field| {
                let value = data.get(field).cloned().unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect();

        let updated = self
            .model
            .update_instance(&current, replacement, &params.options)
            .await
            .map_err(normalize)?;
        Ok(projection::select(
            updated,
            &self.id_field,
            filter.select.as_deref(),
        ))
    }

    async fn remove_records(
        &self,
        id: Option<&Value>,
        params: &Params<M::Options>,
    ) -> Result<Payload, Error> {
        let removed = self.get_or_find(id, params).await?;

        let filter = self.parse(&params.query, &Pagination::disabled())?;
        let where_ = self.write_where(&filter, id)?;
        let count = self
            .model
            .destroy(&where_, &params.options)
            .await
            .map_err(normalize)?;
        tracing::debug!(count, "removed records");

        match id {
            Some(id) => removed
                .into_iter()
                .next()
                .map(Payload::One)
                .ok_or_else(|| not_found(id)),
            None => Ok(Payload::Many(removed)),
        }
    }

    async fn find_records(
        &self,
        query: &FindQuery,
        options: &M::Options,
    ) -> Result<Vec<Record>, Error> {
        Ok(self
            .model
            .find_and_count(query, options)
            .await
            .map_err(normalize)?
            .rows)
    }

    fn parse(&self, query: &QueryFilter, paginate: &Pagination) -> Result<NormalizedFilter, Error> {
        Ok(filter::parse(query, paginate, &self.id_field)?)
    }

    /// The `$select` of a query, ignoring everything else in it.
    fn selected_fields(&self, query: &QueryFilter) -> Result<Option<Vec<String>>, Error> {
        let select: QueryFilter = query
            .iter()
            .filter(|(key, _)| key.as_str() == filter::SELECT)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(self.parse(&select, &Pagination::disabled())?.select)
    }

    fn translate(
        &self,
        filter: &NormalizedFilter,
        options: &M::Options,
    ) -> Result<FindQuery, Error> {
        let query = translation::translate(filter, self.model.table())?;
        Ok(options.apply(query))
    }

    /// Like `translate`, for a query that picks a single record by its id.
    fn translate_one(
        &self,
        filter: &NormalizedFilter,
        options: &M::Options,
    ) -> Result<FindQuery, Error> {
        let query = FindQuery {
            order_by: sql::helpers::empty_order_by(),
            limit: sql::helpers::empty_limit(),
            ..translation::translate(filter, self.model.table())?
        };
        Ok(options.apply(query))
    }

    /// The where clause of a write: the query's predicates, and the id when one is given.
    fn write_where(
        &self,
        filter: &NormalizedFilter,
        id: Option<&Value>,
    ) -> Result<sql::ast::Where, Error> {
        let table = self.model.table();
        let where_ = sql::ast::Where(filtering::translate_predicates(table, &filter.predicates)?);
        match id {
            None => Ok(where_),
            Some(id) => Ok(translation::constrain(
                where_,
                translation::id_equals(table, id)?,
            )),
        }
    }

    /// Count the outcome of an operation, and log it when it failed.
    fn observe<T>(&self, operation: Operation, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(operation);
                }
            }
            Err(err) => {
                tracing::error!(
                    meta.signal_type = "log",
                    event.domain = "crud-sql",
                    event.name = "Record operation error",
                    name = operation.name(),
                    kind = err.kind(),
                    body = %err,
                    error = true,
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(operation);
                }
            }
        }
        result
    }
}

/// The writes of a multi-record mutation ignore `$limit` and `$skip`, so the
/// records it reads must too.
fn unpaged(filter: NormalizedFilter) -> NormalizedFilter {
    NormalizedFilter {
        limit: None,
        skip: 0,
        ..filter
    }
}

fn not_found(id: &Value) -> Error {
    let id = match id {
        Value::String(id) => id.clone(),
        other => other.to_string(),
    };
    Error::NotFound(format!("no record found for id '{id}'"))
}
