//! Trim records down to the fields a caller selected.

use query_engine_execution::Record;

/// Only the `fields` of a record and its id, or the whole record when no fields are given.
///
/// Selected fields the record does not have are left out.
pub fn select(record: Record, id_field: &str, fields: Option<&[String]>) -> Record {
    let Some(fields) = fields else {
        return record;
    };
    let mut record = record;
    let mut selected = Record::new();
    for field in fields.iter().map(String::as_str).chain([id_field]) {
        if let Some(value) = record.remove(field) {
            selected.insert(field.to_string(), value);
        }
    }
    selected
}

/// `select` every record.
pub fn select_all(records: Vec<Record>, id_field: &str, fields: Option<&[String]>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| select(record, id_field, fields))
        .collect()
}
