//! Handle the translation of literal values.

use query_engine_metadata::metadata::database;
use query_engine_sql::sql;

use crate::translation::error::Error;

/// Convert a JSON value compared against a column into a SQL value.
///
/// Strings compared against a column of a non-textual type are cast to that type, for when the
/// user passes e.g. numbers, timestamps or uuids as strings.
pub fn translate_comparison_value(
    value: &serde_json::Value,
    scalar_type: Option<database::ScalarType>,
) -> Result<sql::ast::Value, Error> {
    match value {
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(Error::UnsupportedValue(value.clone()))
        }
        scalar => translate_scalar(scalar, scalar_type),
    }
}

/// Convert a JSON value written to a column into a SQL value. Arrays and objects are bound as
/// json.
pub fn translate_mutation_value(
    value: &serde_json::Value,
    scalar_type: Option<database::ScalarType>,
) -> Result<sql::ast::Value, Error> {
    match value {
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Ok(sql::ast::Value::JsonValue(value.clone()))
        }
        scalar => translate_scalar(scalar, scalar_type),
    }
}

fn translate_scalar(
    value: &serde_json::Value,
    scalar_type: Option<database::ScalarType>,
) -> Result<sql::ast::Value, Error> {
    match value {
        // numbers
        serde_json::Value::Number(num) => match num.as_i64() {
            Some(int) => Ok(sql::ast::Value::Int8(int)),
            None => num
                .as_f64()
                .map(sql::ast::Value::Float8)
                .ok_or_else(|| Error::UnsupportedValue(value.clone())),
        },

        // booleans
        serde_json::Value::Bool(b) => Ok(sql::ast::Value::Bool(*b)),

        // strings
        serde_json::Value::String(s) => match scalar_type {
            Some(scalar_type) if scalar_type.casts_strings() => Ok(sql::ast::Value::Cast {
                value: s.clone(),
                r#type: sql::ast::ScalarTypeName(scalar_type.to_string()),
            }),
            _ => Ok(sql::ast::Value::String(s.clone())),
        },

        // null
        serde_json::Value::Null => Ok(sql::ast::Value::Null),

        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Err(Error::UnsupportedValue(value.clone()))
        }
    }
}
