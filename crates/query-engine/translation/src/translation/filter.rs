//! Parse a caller's query filter into field predicates and paging directives.

use crud_sql_configuration::Pagination;
use serde_json::Value;

use super::error::Error;

/// The query filter as the caller hands it to us. Key order is significant for `$sort`.
pub type QueryFilter = serde_json::Map<String, Value>;

pub const LIMIT: &str = "$limit";
pub const SKIP: &str = "$skip";
pub const SORT: &str = "$sort";
pub const SELECT: &str = "$select";
pub const OR: &str = "$or";
pub const AND: &str = "$and";

/// The operator a bare field value stands for.
pub const EQUALS: &str = "$eq";

/// A single condition on the records.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <operator> value`. The operator is kept verbatim and checked during translation.
    Comparison {
        field: String,
        operator: String,
        value: Value,
    },
    /// Every group must hold.
    And(Vec<Vec<Predicate>>),
    /// At least one group must hold.
    Or(Vec<Vec<Predicate>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A query filter split into what it asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFilter {
    /// Conjoined conditions, in the order they were given.
    pub predicates: Vec<Predicate>,
    pub sort: Vec<(String, SortDirection)>,
    /// `None` is unbounded.
    pub limit: Option<u32>,
    pub skip: u32,
    /// The fields to return. Always contains the id field when present.
    pub select: Option<Vec<String>>,
}

/// Split a query filter into its predicates and directives, applying the page size policy.
pub fn parse(
    query: &QueryFilter,
    paginate: &Pagination,
    id_field: &str,
) -> Result<NormalizedFilter, Error> {
    let mut filter = NormalizedFilter::default();
    let mut requested_limit = None;

    for (key, value) in query {
        match key.as_str() {
            LIMIT => requested_limit = parse_count(value),
            SKIP => filter.skip = parse_count(value).unwrap_or(0),
            SORT => filter.sort = parse_sort(value)?,
            SELECT => filter.select = Some(parse_select(value, id_field)?),
            _ => filter.predicates.extend(parse_predicate(key, value)?),
        }
    }

    filter.limit = effective_limit(requested_limit, paginate);
    Ok(filter)
}

/// The limit to apply, given what the caller asked for.
///
/// Without a default page size the requested limit passes through untouched.
fn effective_limit(requested: Option<u32>, paginate: &Pagination) -> Option<u32> {
    let default = paginate.default?;
    let limit = requested.unwrap_or(default);
    Some(paginate.max.map_or(limit, |max| limit.min(max)))
}

/// A non-negative count. Anything else counts as not given.
fn parse_count(value: &Value) -> Option<u32> {
    let count = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(string) => string.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    Some(u32::try_from(count).unwrap_or(u32::MAX))
}

fn parse_sort(value: &Value) -> Result<Vec<(String, SortDirection)>, Error> {
    let Value::Object(fields) = value else {
        return Err(invalid_directive(SORT, "expected an object of field directions"));
    };
    fields
        .iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Value::Number(number) if number.as_i64() == Some(1) => SortDirection::Ascending,
                Value::Number(number) if number.as_i64() == Some(-1) => SortDirection::Descending,
                Value::String(string) if string == "1" => SortDirection::Ascending,
                Value::String(string) if string == "-1" => SortDirection::Descending,
                other => {
                    return Err(invalid_directive(
                        SORT,
                        &format!("direction of '{field}' must be 1 or -1, got {other}"),
                    ))
                }
            };
            Ok((field.clone(), direction))
        })
        .collect()
}

fn parse_select(value: &Value, id_field: &str) -> Result<Vec<String>, Error> {
    let mut fields = match value {
        Value::String(field) => vec![field.clone()],
        Value::Array(fields) => fields
            .iter()
            .map(|field| match field {
                Value::String(field) => Ok(field.clone()),
                other => Err(invalid_directive(
                    SELECT,
                    &format!("expected field names, got {other}"),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(invalid_directive(
                SELECT,
                "expected a list of field names",
            ))
        }
    };
    if !fields.iter().any(|field| field == id_field) {
        fields.push(id_field.to_string());
    }
    Ok(fields)
}

/// The predicates of one top-level key, or of one key inside an `$or`/`$and` group.
fn parse_predicate(key: &str, value: &Value) -> Result<Vec<Predicate>, Error> {
    match key {
        OR => Ok(vec![Predicate::Or(parse_groups(OR, value)?)]),
        AND => Ok(vec![Predicate::And(parse_groups(AND, value)?)]),
        _ if key.starts_with('$') => Err(Error::UnsupportedOperator(key.to_string())),
        field => Ok(parse_field(field, value)),
    }
}

/// A bare value means equality. An object holds one comparison per operator.
fn parse_field(field: &str, value: &Value) -> Vec<Predicate> {
    match value {
        Value::Object(operators) => operators
            .iter()
            .map(|(operator, value)| Predicate::Comparison {
                field: field.to_string(),
                operator: operator.clone(),
                value: value.clone(),
            })
            .collect(),
        value => vec![Predicate::Comparison {
            field: field.to_string(),
            operator: EQUALS.to_string(),
            value: value.clone(),
        }],
    }
}

fn parse_groups(directive: &str, value: &Value) -> Result<Vec<Vec<Predicate>>, Error> {
    let Value::Array(groups) = value else {
        return Err(invalid_directive(directive, "expected a list of queries"));
    };
    groups
        .iter()
        .map(|group| match group {
            Value::Object(group) => group
                .iter()
                .map(|(key, value)| parse_predicate(key, value))
                .collect::<Result<Vec<_>, _>>()
                .map(|predicates| predicates.into_iter().flatten().collect()),
            other => Err(invalid_directive(
                directive,
                &format!("expected a query, got {other}"),
            )),
        })
        .collect()
}

fn invalid_directive(directive: &str, message: &str) -> Error {
    Error::InvalidDirective {
        directive: directive.to_string(),
        message: message.to_string(),
    }
}
