//! A `Model` that keeps its records in memory and evaluates the translated SQL itself.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use query_engine_execution::{Error, FindAndCount, Model, Record};
use query_engine_metadata::metadata::TableInfo;
use query_engine_sql::sql::ast;
use query_engine_translation::translation::query::{self as translation, FindQuery};

/// An error the next engine call raises instead of running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NotFound,
    Constraint {
        message: String,
        constraint: Option<String>,
    },
    Engine(String),
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Failure::NotFound => Error::RecordNotFound,
            Failure::Constraint {
                message,
                constraint,
            } => Error::Constraint {
                message,
                constraint,
            },
            Failure::Engine(message) => Error::Engine(message),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    rows: Vec<Record>,
    last_id: i64,
    failure: Option<Failure>,
    calls: Vec<&'static str>,
}

impl Store {
    fn insert(&mut self, table: &TableInfo, mut record: Record) -> Result<Record, Error> {
        let key = &table.primary_key;
        match record.get(key) {
            None | Some(Value::Null) => {
                self.last_id += 1;
                record.insert(key.clone(), Value::from(self.last_id));
            }
            Some(id) => {
                if self.rows.iter().any(|row| row.get(key) == Some(id)) {
                    let constraint = format!("{}_pkey", table.table_name);
                    return Err(Error::Constraint {
                        message: format!(
                            "duplicate key value violates unique constraint \"{constraint}\""
                        ),
                        constraint: Some(constraint),
                    });
                }
                if let Some(id) = id.as_i64() {
                    self.last_id = self.last_id.max(id);
                }
            }
        }
        self.rows.push(record.clone());
        Ok(record)
    }

    /// Indices of the rows `where_` holds for.
    fn matching(&self, where_: &ast::Expression) -> Result<Vec<usize>, Error> {
        let mut indices = vec![];
        for (index, row) in self.rows.iter().enumerate() {
            if holds(where_, row)? {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    fn find_and_count(&self, query: &FindQuery) -> Result<FindAndCount, Error> {
        let mut keyed = vec![];
        for index in self.matching(&query.where_.0)? {
            let row = &self.rows[index];
            let keys = query
                .order_by
                .elements
                .iter()
                .map(|element| value_of(&element.target, row))
                .collect::<Result<Vec<_>, Error>>()?;
            keyed.push((keys, row));
        }
        let count = keyed.len() as u64;

        keyed.sort_by(|(left, _), (right, _)| {
            query
                .order_by
                .elements
                .iter()
                .zip(left.iter().zip(right))
                .map(|(element, (left, right))| {
                    let ordering = sort_order(left, right);
                    match element.direction {
                        ast::OrderByDirection::Asc => ordering,
                        ast::OrderByDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset = query.limit.offset.map_or(0, to_usize);
        let limit = query.limit.limit.map_or(usize::MAX, to_usize);
        let rows = keyed
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, row)| project(row, query.attributes.as_deref()))
            .collect();

        Ok(FindAndCount { count, rows })
    }
}

fn to_usize(count: u32) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// A table held in memory. Ids are assigned from an increasing integer when a record has none.
#[derive(Debug)]
pub struct MemoryModel {
    table: TableInfo,
    store: Mutex<Store>,
}

impl MemoryModel {
    pub fn new(table: TableInfo) -> Self {
        MemoryModel {
            table,
            store: Mutex::new(Store::default()),
        }
    }

    /// A table holding `records`. Records with an id already taken are dropped.
    pub fn with_records(table: TableInfo, records: impl IntoIterator<Item = Record>) -> Self {
        let model = MemoryModel::new(table);
        {
            let mut store = model.lock();
            for record in records {
                let _ = store.insert(&model.table, record);
            }
        }
        model
    }

    /// Make the next engine call fail.
    pub fn fail_next(&self, failure: Failure) {
        self.lock().failure = Some(failure);
    }

    /// Every stored record, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.lock().rows.clone()
    }

    /// The engine calls made so far, by `Model` method name.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, call: &'static str) -> Result<MutexGuard<'_, Store>, Error> {
        let mut store = self.lock();
        store.calls.push(call);
        match store.failure.take() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(store),
        }
    }
}

#[async_trait]
impl Model for MemoryModel {
    type Options = ();

    fn table(&self) -> &TableInfo {
        &self.table
    }

    async fn find_and_count(&self, query: &FindQuery, _options: &()) -> Result<FindAndCount, Error> {
        let store = self.enter("find_and_count")?;
        tracing::debug!(?query, "memory find");
        store.find_and_count(query)
    }

    async fn find_by_id(
        &self,
        id: &Value,
        query: &FindQuery,
        _options: &(),
    ) -> Result<Option<Record>, Error> {
        let store = self.enter("find_by_id")?;
        let query = query
            .clone()
            .constrained(translation::id_equals(&self.table, id)?);
        Ok(store.find_and_count(&query)?.rows.into_iter().next())
    }

    async fn create(&self, record: Record, _options: &()) -> Result<Record, Error> {
        let mut store = self.enter("create")?;
        store.insert(&self.table, record)
    }

    async fn bulk_create(&self, records: Vec<Record>, _options: &()) -> Result<Vec<Record>, Error> {
        let mut store = self.enter("bulk_create")?;
        let before = store.rows.len();
        let mut created = vec![];
        for record in records {
            match store.insert(&self.table, record) {
                Ok(record) => created.push(record),
                Err(err) => {
                    // a failed statement inserts nothing
                    store.rows.truncate(before);
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    async fn update(&self, changes: Record, where_: &ast::Where, _options: &()) -> Result<u64, Error> {
        let mut store = self.enter("update")?;
        let indices = store.matching(&where_.0)?;
        for index in &indices {
            let row = &mut store.rows[*index];
            for (column, value) in &changes {
                row.insert(column.clone(), value.clone());
            }
        }
        Ok(indices.len() as u64)
    }

    async fn destroy(&self, where_: &ast::Where, _options: &()) -> Result<u64, Error> {
        let mut store = self.enter("destroy")?;
        let indices = store.matching(&where_.0)?;
        let mut index = 0;
        store.rows.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        Ok(indices.len() as u64)
    }

    async fn update_instance(
        &self,
        instance: &Record,
        changes: Record,
        _options: &(),
    ) -> Result<Record, Error> {
        let mut store = self.enter("update_instance")?;
        let key = &self.table.primary_key;
        let id = instance
            .get(key)
            .ok_or_else(|| Error::Engine(format!("the record has no '{key}' to update it by")))?;
        let row = store
            .rows
            .iter_mut()
            .find(|row| row.get(key) == Some(id))
            .ok_or(Error::RecordNotFound)?;
        for (column, value) in changes {
            row.insert(column, value);
        }
        Ok(row.clone())
    }
}

/// Only the `columns` of a row, or all of it.
fn project(row: &Record, columns: Option<&[ast::ColumnName]>) -> Record {
    match columns {
        None => row.clone(),
        Some(columns) => columns
            .iter()
            .filter_map(|ast::ColumnName(column)| {
                row.get(column).map(|value| (column.clone(), value.clone()))
            })
            .collect(),
    }
}

/// Whether a condition is true for a row. Unknown is not true.
fn holds(expression: &ast::Expression, row: &Record) -> Result<bool, Error> {
    Ok(truth_of(expression, row)? == Some(true))
}

/// Evaluate a condition with SQL's three-valued logic. `None` is unknown.
fn truth_of(expression: &ast::Expression, row: &Record) -> Result<Option<bool>, Error> {
    match expression {
        ast::Expression::And { left, right } => {
            Ok(match (truth_of(left, row)?, truth_of(right, row)?) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        }
        ast::Expression::Or { left, right } => {
            Ok(match (truth_of(left, row)?, truth_of(right, row)?) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })
        }
        ast::Expression::Not(expression) => Ok(truth_of(expression, row)?.map(|truth| !truth)),
        ast::Expression::UnaryOperation {
            expression,
            operator,
        } => {
            let is_null = value_of(expression, row)?.is_null();
            Ok(Some(match operator {
                ast::UnaryOperator::IsNull => is_null,
                ast::UnaryOperator::IsNotNull => !is_null,
            }))
        }
        ast::Expression::BinaryOperation {
            left,
            operator,
            right,
        } => {
            let left = value_of(left, row)?;
            let right = value_of(right, row)?;
            if left.is_null() || right.is_null() {
                return Ok(None);
            }
            compare_with(*operator, &left, &right).map(Some)
        }
        ast::Expression::BinaryArrayOperation {
            left,
            operator,
            right,
        } => {
            let left = value_of(left, row)?;
            if left.is_null() {
                return Ok(None);
            }
            let mut found = Some(false);
            for item in right {
                let item = value_of(item, row)?;
                if item.is_null() {
                    found = None;
                } else if compare(&left, &item)? == Ordering::Equal {
                    found = Some(true);
                    break;
                }
            }
            Ok(match operator {
                ast::BinaryArrayOperator::In => found,
                ast::BinaryArrayOperator::NotIn => found.map(|found| !found),
            })
        }
        other => match value_of(other, row)? {
            Value::Bool(truth) => Ok(Some(truth)),
            Value::Null => Ok(None),
            value => Err(Error::Engine(format!("{value} is not a condition"))),
        },
    }
}

fn value_of(expression: &ast::Expression, row: &Record) -> Result<Value, Error> {
    match expression {
        ast::Expression::ColumnReference(ast::ColumnName(column)) => {
            Ok(row.get(column).cloned().unwrap_or(Value::Null))
        }
        ast::Expression::Value(value) => Ok(match value {
            ast::Value::Int8(int) => Value::from(*int),
            ast::Value::Float8(float) => serde_json::Number::from_f64(*float)
                .map_or(Value::Null, Value::Number),
            ast::Value::Bool(truth) => Value::Bool(*truth),
            ast::Value::String(string) => Value::String(string.clone()),
            ast::Value::Null => Value::Null,
            // only numbers and booleans are converted; dates and the like compare as text
            ast::Value::Cast { value, .. } => match serde_json::from_str(value) {
                Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
                _ => Value::String(value.clone()),
            },
            ast::Value::JsonValue(value) => value.clone(),
            ast::Value::EmptyJsonArray => Value::Array(vec![]),
        }),
        other => holds_value(other, row),
    }
}

fn holds_value(expression: &ast::Expression, row: &Record) -> Result<Value, Error> {
    match expression {
        ast::Expression::And { .. }
        | ast::Expression::Or { .. }
        | ast::Expression::Not(_)
        | ast::Expression::UnaryOperation { .. }
        | ast::Expression::BinaryOperation { .. }
        | ast::Expression::BinaryArrayOperation { .. } => {
            Ok(truth_of(expression, row)?.map_or(Value::Null, Value::Bool))
        }
        other => Err(Error::Engine(format!(
            "the in-memory engine cannot evaluate {other:?}"
        ))),
    }
}

fn compare_with(operator: ast::BinaryOperator, left: &Value, right: &Value) -> Result<bool, Error> {
    match operator {
        ast::BinaryOperator::Equals => Ok(compare(left, right)? == Ordering::Equal),
        ast::BinaryOperator::NotEquals => Ok(compare(left, right)? != Ordering::Equal),
        ast::BinaryOperator::LessThan => Ok(compare(left, right)? == Ordering::Less),
        ast::BinaryOperator::LessThanOrEqualTo => Ok(compare(left, right)? != Ordering::Greater),
        ast::BinaryOperator::GreaterThan => Ok(compare(left, right)? == Ordering::Greater),
        ast::BinaryOperator::GreaterThanOrEqualTo => Ok(compare(left, right)? != Ordering::Less),
        ast::BinaryOperator::Like => like_strings(left, right, false),
        ast::BinaryOperator::NotLike => like_strings(left, right, false).map(|like| !like),
        ast::BinaryOperator::CaseInsensitiveLike => like_strings(left, right, true),
        ast::BinaryOperator::NotCaseInsensitiveLike => {
            like_strings(left, right, true).map(|like| !like)
        }
    }
}

/// Compare two non-null values of the same kind.
fn compare(left: &Value, right: &Value) -> Result<Ordering, Error> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .zip(right.as_f64())
            .and_then(|(left, right)| left.partial_cmp(&right))
            .ok_or_else(|| Error::Engine(format!("cannot compare {left} with {right}"))),
        (Value::String(left), Value::String(right)) => Ok(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Ok(left.cmp(right)),
        (left, right) if left == right => Ok(Ordering::Equal),
        (left, right) => Err(Error::Engine(format!("cannot compare {left} with {right}"))),
    }
}

/// The order of two sort keys. Nulls sort after everything else, as they do in ascending
/// PostgreSQL order.
fn sort_order(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
    }
}

fn like_strings(value: &Value, pattern: &Value, case_insensitive: bool) -> Result<bool, Error> {
    match (value, pattern) {
        (Value::String(value), Value::String(pattern)) if case_insensitive => {
            Ok(like(&value.to_lowercase(), &pattern.to_lowercase()))
        }
        (Value::String(value), Value::String(pattern)) => Ok(like(value, pattern)),
        (value, pattern) => Err(Error::Engine(format!(
            "cannot match {value} against the pattern {pattern}"
        ))),
    }
}

/// SQL `LIKE`: `%` matches any run of characters and `_` any single one.
fn like(text: &str, pattern: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    // matched[j]: the text read so far matches the first j pattern characters
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for (j, p) in pattern.iter().enumerate() {
        matched[j + 1] = matched[j] && *p == '%';
    }
    for c in text.chars() {
        let mut next = vec![false; pattern.len() + 1];
        for (j, p) in pattern.iter().enumerate() {
            next[j + 1] = match p {
                '%' => next[j] || matched[j + 1],
                '_' => matched[j],
                p => matched[j] && *p == c,
            };
        }
        matched = next;
    }
    matched[pattern.len()]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use query_engine_sql::sql::helpers;

    use super::*;
    use crate::fixtures;

    fn comparison(column: &str, operator: ast::BinaryOperator, value: ast::Value) -> ast::Expression {
        ast::Expression::BinaryOperation {
            left: Box::new(helpers::column(column)),
            operator,
            right: Box::new(ast::Expression::Value(value)),
        }
    }

    #[test]
    fn like_matches_wildcards() {
        assert!(like("alice", "a%"));
        assert!(like("alice", "%lic%"));
        assert!(like("alice", "_lice"));
        assert!(like("", "%"));
        assert!(!like("alice", "a_"));
        assert!(!like("alice", "bob%"));
    }

    #[test]
    fn comparisons_with_null_are_unknown() {
        let row = fixtures::record(json!({"id": 1, "age": null}));
        let age_is_one = comparison("age", ast::BinaryOperator::Equals, ast::Value::Int8(1));

        assert_eq!(truth_of(&age_is_one, &row).unwrap(), None);
        assert_eq!(
            truth_of(&ast::Expression::Not(Box::new(age_is_one)), &row).unwrap(),
            None
        );
    }

    #[test]
    fn not_in_a_list_with_null_is_unknown() {
        let row = fixtures::record(json!({"id": 1}));
        let not_in = ast::Expression::BinaryArrayOperation {
            left: Box::new(helpers::column("id")),
            operator: ast::BinaryArrayOperator::NotIn,
            right: vec![
                ast::Expression::Value(ast::Value::Int8(2)),
                ast::Expression::Value(ast::Value::Null),
            ],
        };
        assert_eq!(truth_of(&not_in, &row).unwrap(), None);
    }

    #[test]
    fn casts_compare_as_numbers() {
        let row = fixtures::record(json!({"id": 1, "age": 30}));
        let cast = ast::Value::Cast {
            value: "30".to_string(),
            r#type: ast::ScalarTypeName("integer".to_string()),
        };
        assert!(holds(&comparison("age", ast::BinaryOperator::Equals, cast), &row).unwrap());
    }

    #[tokio::test]
    async fn ascending_order_puts_nulls_last() {
        let model = MemoryModel::with_records(
            fixtures::people_table(),
            [
                fixtures::record(json!({"id": 1, "age": null})),
                fixtures::record(json!({"id": 2, "age": 40})),
                fixtures::record(json!({"id": 3, "age": 20})),
            ],
        );
        let query = FindQuery {
            order_by: ast::OrderBy {
                elements: vec![ast::OrderByElement {
                    target: helpers::column("age"),
                    direction: ast::OrderByDirection::Asc,
                }],
            },
            ..FindQuery::all()
        };

        let found = model.find_and_count(&query, &()).await.unwrap();

        let ids: Vec<&Value> = found.rows.iter().filter_map(|row| row.get("id")).collect();
        assert_eq!(ids, vec![&json!(3), &json!(2), &json!(1)]);
    }

    #[tokio::test]
    async fn ids_are_assigned_and_must_be_unique() {
        let model = MemoryModel::new(fixtures::people_table());

        let created = model
            .create(fixtures::record(json!({"name": "alice"})), &())
            .await
            .unwrap();
        assert_eq!(created.get("id"), Some(&json!(1)));

        let duplicate = model
            .create(fixtures::record(json!({"id": 1, "name": "bob"})), &())
            .await;
        assert!(matches!(duplicate, Err(Error::Constraint { .. })));
        assert_eq!(model.records().len(), 1);
    }

    #[tokio::test]
    async fn failures_are_raised_once() {
        let model = fixtures::people_model();
        model.fail_next(Failure::Engine("connection reset".to_string()));

        assert!(model.find_and_count(&FindQuery::all(), &()).await.is_err());
        assert!(model.find_and_count(&FindQuery::all(), &()).await.is_ok());
        assert_eq!(model.calls(), vec!["find_and_count", "find_and_count"]);
    }
}
