//! Common functions used across test cases.

use serde_json::Value;

use crud_sql::{Params, RecordService, ServiceOptions};
use crud_sql_configuration::Pagination;
use query_engine_execution::Record;
use query_engine_translation::translation::filter::QueryFilter;
use tests_common::{fixtures, MemoryModel};

pub fn query(value: Value) -> QueryFilter {
    match value {
        Value::Object(query) => query,
        other => panic!("not a query: {other}"),
    }
}

pub fn params(value: Value) -> Params<()> {
    Params::new(query(value))
}

/// A service over the people fixtures, without paging.
pub fn people_service() -> RecordService<MemoryModel> {
    tests_common::init_logging();
    RecordService::new(ServiceOptions::new(fixtures::people_model())).unwrap()
}

/// A service over `count` numbered people, paged as given.
pub fn paginated_service(count: i64, paginate: Pagination) -> RecordService<MemoryModel> {
    tests_common::init_logging();
    let model = MemoryModel::with_records(fixtures::people_table(), fixtures::numbered_people(count));
    RecordService::new(ServiceOptions::new(model).with_paginate(paginate)).unwrap()
}

/// The ids of some records, in order.
pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|record| record.get("id").and_then(Value::as_i64))
        .collect()
}

/// The ids of every record left in the service's table.
pub fn stored_ids(service: &RecordService<MemoryModel>) -> Vec<i64> {
    ids(&service.model().records())
}
