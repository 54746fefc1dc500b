//! Build the SELECT statements that read records.

use query_engine_metadata::metadata::database;
use query_engine_sql::sql;

use super::FindQuery;

/// The schema and table name of a table.
pub fn table_names(table: &database::TableInfo) -> (sql::ast::SchemaName, sql::ast::TableName) {
    (
        sql::ast::SchemaName(table.schema_name.clone()),
        sql::ast::TableName(table.table_name.clone()),
    )
}

fn from(table: &database::TableInfo) -> sql::ast::From {
    let (schema, table) = table_names(table);
    sql::helpers::from_table(&schema, &table)
}

/// The rows a query asks for.
fn translate_rows(
    table: &database::TableInfo,
    query: &FindQuery,
    lock: Option<sql::ast::RowLock>,
) -> sql::ast::Select {
    let mut select = sql::helpers::star_select(from(table));
    if let Some(attributes) = &query.attributes {
        select.select_list = sql::helpers::select_columns(attributes);
    }
    select.where_ = query.where_.clone();
    select.order_by = query.order_by.clone();
    select.limit = query.limit.clone();
    select.lock = lock;
    select
}

/// One json object holding the rows a query asks for and how many rows match it
/// regardless of its limit and offset.
pub fn translate_find_and_count(
    table: &database::TableInfo,
    query: &FindQuery,
    lock: Option<sql::ast::RowLock>,
) -> sql::ast::Statement {
    let rows = translate_rows(table, query, lock);
    let count = sql::helpers::count_select(from(table), query.where_.clone());
    sql::ast::Statement::Select(sql::helpers::select_rows_and_count(rows, count))
}

/// A json array of the rows a query asks for.
pub fn translate_find(
    table: &database::TableInfo,
    query: &FindQuery,
    lock: Option<sql::ast::RowLock>,
) -> sql::ast::Statement {
    let rows = translate_rows(table, query, lock);
    sql::ast::Statement::Select(sql::helpers::json_agg_select(sql::ast::From::Select {
        select: Box::new(rows),
        alias: sql::helpers::make_table_alias(sql::helpers::ROWS_ALIAS),
    }))
}
