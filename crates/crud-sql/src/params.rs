//! What callers pass to a record service, and what they get back.

use crud_sql_configuration::Pagination;
use query_engine_execution::Record;
use query_engine_translation::translation::filter::QueryFilter;
use serde::{Deserialize, Serialize};

/// The parameters of a record operation.
#[derive(Clone, Default)]
pub struct Params<O> {
    pub query: QueryFilter,
    /// Overrides the service's page size policy for this call.
    /// `Some(Pagination::disabled())` turns paging off.
    pub paginate: Option<Pagination>,
    /// Passed along to the storage engine.
    pub options: O,
}

impl<O: Default> Params<O> {
    pub fn new(query: QueryFilter) -> Self {
        Params {
            query,
            paginate: None,
            options: O::default(),
        }
    }
}

impl<O> Params<O> {
    #[must_use]
    pub fn with_paginate(mut self, paginate: Pagination) -> Self {
        self.paginate = Some(paginate);
        self
    }

    #[must_use]
    pub fn with_options<P>(self, options: P) -> Params<P> {
        Params {
            query: self.query,
            paginate: self.paginate,
            options,
        }
    }
}

/// One record or several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    One(Record),
    Many(Vec<Record>),
}

impl Payload {
    /// The records, however many there are.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Payload::One(record) => vec![record],
            Payload::Many(records) => records,
        }
    }
}

/// A page of a paginated find.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// How many records match the query, regardless of the page.
    pub total: u64,
    pub limit: Option<u32>,
    pub skip: u32,
    pub data: Vec<Record>,
}

/// The outcome of a find: a page when paginated, a plain list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindResult {
    Page(Page),
    Records(Vec<Record>),
}

impl FindResult {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            FindResult::Page(page) => page.data,
            FindResult::Records(records) => records,
        }
    }
}
