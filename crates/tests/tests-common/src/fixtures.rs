//! Tables and records used across test cases.

use serde_json::{json, Value};

use query_engine_execution::Record;
use query_engine_metadata::metadata::{ScalarType, TableInfo};

use crate::memory::MemoryModel;

/// A JSON object as a record. Anything else is an empty record.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}

/// `public.people`, keyed by an integer `id`.
pub fn people_table() -> TableInfo {
    TableInfo::new("people")
        .with_column("id", ScalarType::Integer)
        .with_column("name", ScalarType::Text)
        .with_column("age", ScalarType::Integer)
        .with_column("status", ScalarType::Text)
        .with_column("email", ScalarType::Text)
}

/// Five people with ids 1 to 5. Erin has no age.
pub fn people() -> Vec<Record> {
    [
        json!({"id": 1, "name": "alice", "age": 30, "status": "active", "email": "alice@example.com"}),
        json!({"id": 2, "name": "bob", "age": 25, "status": "active", "email": "bob@example.com"}),
        json!({"id": 3, "name": "carol", "age": 40, "status": "inactive", "email": "carol@example.com"}),
        json!({"id": 4, "name": "dave", "age": 35, "status": "active", "email": null}),
        json!({"id": 5, "name": "erin", "age": null, "status": "pending", "email": "erin@example.com"}),
    ]
    .into_iter()
    .map(record)
    .collect()
}

/// The `people` table holding `people()`.
pub fn people_model() -> MemoryModel {
    MemoryModel::with_records(people_table(), people())
}

/// `count` people with ids 1 to `count`, named after their id.
pub fn numbered_people(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|id| record(json!({"id": id, "name": format!("person {id}"), "status": "active"})))
        .collect()
}
