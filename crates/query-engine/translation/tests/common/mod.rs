use std::fs;
use std::path::PathBuf;

use crud_sql_configuration::Pagination;
use query_engine_metadata::metadata::{TableInfo, TablesInfo};
use query_engine_sql::sql;
use query_engine_translation::translation::{self, filter::QueryFilter};
use serde::Deserialize;

/// A recorded find request: the caller's query and the page size policy in effect.
#[derive(Deserialize)]
struct Request {
    query: QueryFilter,
    #[serde(default)]
    paginate: Pagination,
}

/// The `users` table the golden files query.
pub fn users() -> TableInfo {
    let tables: TablesInfo =
        serde_json::from_str(&fs::read_to_string("tests/goldenfiles/tables.json").unwrap())
            .unwrap();
    tables.0["users"].clone()
}

/// Translate a recorded find request to the SQL counting and fetching its records, along with the
/// parameters bound to it.
pub fn test_translation(testname: &str) -> Result<String, translation::error::Error> {
    let directory = PathBuf::from("tests/goldenfiles").join(testname);
    let request: Request =
        serde_json::from_str(&fs::read_to_string(directory.join("request.json")).unwrap())
            .unwrap();

    let table = users();
    let filter = translation::filter::parse(&request.query, &request.paginate, &table.primary_key)?;
    let query = translation::query::translate(&filter, &table)?;
    let statement = translation::query::root::translate_find_and_count(&table, &query, None);

    Ok(render(&statement))
}

/// The SQL of a statement followed by its numbered parameters.
pub fn render(statement: &sql::ast::Statement) -> String {
    let query = statement.query_sql();
    let params: Vec<(usize, &sql::string::Param)> = query
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, p))
        .collect();

    format!("{}\n\n{:?}", query.sql, params)
}
