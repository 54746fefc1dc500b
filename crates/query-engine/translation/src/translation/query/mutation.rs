//! Build the INSERT, UPDATE and DELETE statements that write records.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::database;
use query_engine_sql::sql;

use super::root::table_names;
use super::values;
use crate::translation::error::Error;

/// A record as a map from column name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

fn translate_mutation_value(
    table: &database::TableInfo,
    column: &str,
    value: &serde_json::Value,
) -> Result<sql::ast::MutationValueExpression, Error> {
    values::translate_mutation_value(value, table.column_type(column)).map(|value| {
        sql::ast::MutationValueExpression::Expression(sql::ast::Expression::Value(value))
    })
}

/// Insert `records`, returning the inserted rows as a json array.
///
/// Columns a record does not mention get their default. `records` must not be empty.
pub fn translate_insert(
    table: &database::TableInfo,
    records: &[Record],
) -> Result<sql::ast::Statement, Error> {
    let mut columns: Vec<String> = vec![];
    for record in records {
        for column in record.keys() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let from = if columns.is_empty() && records.len() == 1 {
        sql::ast::InsertFrom::DefaultValues
    } else {
        // several rows of defaults still need a column to write DEFAULT into.
        if columns.is_empty() {
            columns.push(table.primary_key.clone());
        }
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| match record.get(column) {
                        Some(value) => translate_mutation_value(table, column, value),
                        None => Ok(sql::ast::MutationValueExpression::Default),
                    })
                    .collect::<Result<Vec<_>, Error>>()
            })
            .collect::<Result<Vec<_>, Error>>()?;
        sql::ast::InsertFrom::Values(rows)
    };

    let (schema, table_name) = table_names(table);
    let insert = sql::ast::Insert {
        schema,
        table: table_name,
        columns: columns.into_iter().map(sql::ast::ColumnName).collect(),
        from,
        returning: Some(sql::ast::Returning(sql::ast::SelectList::SelectStar)),
    };

    Ok(sql::ast::Statement::Select(
        sql::helpers::select_mutated_rows(sql::ast::CTExpr::Insert(insert)),
    ))
}

fn translate_update_clause(
    table: &database::TableInfo,
    changes: &Record,
    where_: &sql::ast::Where,
    returning: Option<sql::ast::Returning>,
) -> Result<Option<sql::ast::Update>, Error> {
    if changes.is_empty() {
        return Ok(None);
    }
    let set = changes
        .iter()
        .map(|(column, value)| {
            Ok((
                sql::ast::ColumnName(column.clone()),
                translate_mutation_value(table, column, value)?,
            ))
        })
        .collect::<Result<BTreeMap<_, _>, Error>>()?;

    let (schema, table_name) = table_names(table);
    Ok(Some(sql::ast::Update {
        schema,
        table: table_name,
        set,
        where_: where_.clone(),
        returning,
    }))
}

/// Write `changes` to every row matching `where_`. `None` when there is nothing to write.
pub fn translate_update(
    table: &database::TableInfo,
    changes: &Record,
    where_: &sql::ast::Where,
) -> Result<Option<sql::ast::Statement>, Error> {
    Ok(translate_update_clause(table, changes, where_, None)?.map(sql::ast::Statement::Update))
}

/// Like `translate_update`, returning the updated rows as a json array.
pub fn translate_update_returning(
    table: &database::TableInfo,
    changes: &Record,
    where_: &sql::ast::Where,
) -> Result<Option<sql::ast::Statement>, Error> {
    let returning = Some(sql::ast::Returning(sql::ast::SelectList::SelectStar));
    Ok(
        translate_update_clause(table, changes, where_, returning)?.map(|update| {
            sql::ast::Statement::Select(sql::helpers::select_mutated_rows(
                sql::ast::CTExpr::Update(update),
            ))
        }),
    )
}

/// Delete every row matching `where_`.
pub fn translate_delete(
    table: &database::TableInfo,
    where_: &sql::ast::Where,
) -> sql::ast::Statement {
    let (schema, table_name) = table_names(table);
    sql::ast::Statement::Delete(sql::ast::Delete {
        schema,
        table: table_name,
        where_: where_.clone(),
        returning: None,
    })
}
