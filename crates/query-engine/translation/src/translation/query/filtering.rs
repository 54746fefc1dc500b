//! Handle filtering/where clauses translation.

use query_engine_metadata::metadata::{database, ComparisonOperator};
use query_engine_sql::sql;

use super::values;
use crate::translation::error::Error;
use crate::translation::filter::Predicate;

/// Translate a list of predicates to a boolean expression that holds when all of them do.
pub fn translate_predicates(
    table: &database::TableInfo,
    predicates: &[Predicate],
) -> Result<sql::ast::Expression, Error> {
    predicates
        .iter()
        .map(|predicate| translate_predicate(table, predicate))
        .collect::<Result<Vec<_>, Error>>()
        .map(sql::helpers::conjoin)
}

fn translate_predicate(
    table: &database::TableInfo,
    predicate: &Predicate,
) -> Result<sql::ast::Expression, Error> {
    match predicate {
        Predicate::Comparison {
            field,
            operator,
            value,
        } => {
            let operator = ComparisonOperator::from_name(operator)
                .ok_or_else(|| Error::UnsupportedOperator(operator.clone()))?;
            translate_comparison(table, field, operator, value)
        }
        Predicate::And(groups) => groups
            .iter()
            .map(|group| translate_predicates(table, group))
            .collect::<Result<Vec<_>, Error>>()
            .map(sql::helpers::conjoin),
        Predicate::Or(groups) => groups
            .iter()
            .map(|group| translate_predicates(table, group))
            .collect::<Result<Vec<_>, Error>>()
            .map(sql::helpers::disjoin),
    }
}

/// Translate a single `field <operator> value` comparison.
pub fn translate_comparison(
    table: &database::TableInfo,
    field: &str,
    operator: ComparisonOperator,
    value: &serde_json::Value,
) -> Result<sql::ast::Expression, Error> {
    let scalar_type = table.column_type(field);
    if let Some(scalar_type) = scalar_type {
        if !scalar_type.comparison_operators().contains(&operator) {
            return Err(Error::OperatorNotSupportedForType {
                field: field.to_string(),
                operator: operator.to_string(),
                scalar_type,
            });
        }
    }

    let left = Box::new(sql::helpers::column(field));

    match (operator, value) {
        // `= NULL` is never true.
        (ComparisonOperator::Equals, serde_json::Value::Null) => {
            Ok(sql::ast::Expression::UnaryOperation {
                expression: left,
                operator: sql::ast::UnaryOperator::IsNull,
            })
        }
        (ComparisonOperator::NotEquals, serde_json::Value::Null) => {
            Ok(sql::ast::Expression::UnaryOperation {
                expression: left,
                operator: sql::ast::UnaryOperator::IsNotNull,
            })
        }
        (ComparisonOperator::In | ComparisonOperator::NotIn, serde_json::Value::Array(items)) => {
            let operator = if operator == ComparisonOperator::In {
                sql::ast::BinaryArrayOperator::In
            } else {
                sql::ast::BinaryArrayOperator::NotIn
            };
            if items.is_empty() {
                return Ok(match operator {
                    sql::ast::BinaryArrayOperator::In => sql::helpers::false_expr(),
                    sql::ast::BinaryArrayOperator::NotIn => sql::helpers::true_expr(),
                });
            }
            let right = items
                .iter()
                .map(|item| {
                    values::translate_comparison_value(item, scalar_type)
                        .map(sql::ast::Expression::Value)
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(sql::ast::Expression::BinaryArrayOperation {
                left,
                operator,
                right,
            })
        }
        (ComparisonOperator::In | ComparisonOperator::NotIn, other) => {
            Err(Error::InvalidOperand {
                field: field.to_string(),
                operator: operator.to_string(),
                message: format!("expected a list of values, got {other}"),
            })
        }
        (operator, value) => Ok(sql::ast::Expression::BinaryOperation {
            left,
            operator: translate_operator(operator),
            right: Box::new(sql::ast::Expression::Value(
                values::translate_comparison_value(value, scalar_type)?,
            )),
        }),
    }
}

/// The SQL operator of a scalar comparison. List operators are translated separately and only
/// reach this for a single value.
fn translate_operator(operator: ComparisonOperator) -> sql::ast::BinaryOperator {
    match operator {
        ComparisonOperator::Equals | ComparisonOperator::In => sql::ast::BinaryOperator::Equals,
        ComparisonOperator::NotEquals | ComparisonOperator::NotIn => {
            sql::ast::BinaryOperator::NotEquals
        }
        ComparisonOperator::LessThan => sql::ast::BinaryOperator::LessThan,
        ComparisonOperator::LessThanOrEqualTo => sql::ast::BinaryOperator::LessThanOrEqualTo,
        ComparisonOperator::GreaterThan => sql::ast::BinaryOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqualTo => {
            sql::ast::BinaryOperator::GreaterThanOrEqualTo
        }
        ComparisonOperator::Like => sql::ast::BinaryOperator::Like,
        ComparisonOperator::NotLike => sql::ast::BinaryOperator::NotLike,
        ComparisonOperator::CaseInsensitiveLike => sql::ast::BinaryOperator::CaseInsensitiveLike,
        ComparisonOperator::NotCaseInsensitiveLike => {
            sql::ast::BinaryOperator::NotCaseInsensitiveLike
        }
    }
}
