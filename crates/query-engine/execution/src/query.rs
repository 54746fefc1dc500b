//! Execute SQL statements against the database.

use sqlx::Row;

use query_engine_sql::sql;

use crate::error::Error;

/// Run a statement returning a single json value, and return that value.
pub async fn fetch_json<'c, E>(
    executor: E,
    statement: &sql::ast::Statement,
) -> Result<serde_json::Value, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let query = statement.query_sql();

    tracing::debug!(generated_sql = query.sql, params = ?&query.params);

    let row = build_query_with_params(&query)
        .fetch_one(executor)
        .await?;
    let value: serde_json::Value = row.try_get(0)?;
    Ok(value)
}

/// Run a statement returning nothing, and return the number of rows it affected.
pub async fn execute<'c, E>(executor: E, statement: &sql::ast::Statement) -> Result<u64, Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let query = statement.query_sql();

    tracing::debug!(generated_sql = query.sql, params = ?&query.params);

    let result = build_query_with_params(&query).execute(executor).await?;
    Ok(result.rows_affected())
}

/// Run `EXPLAIN` on a statement. Returns the formatted SQL and the query plan.
pub async fn explain<'c, E>(
    executor: E,
    statement: &sql::ast::Statement,
) -> Result<(String, String), Error>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let mut query = sql::string::SQL::new();
    query.append_syntax("EXPLAIN ");
    statement.to_sql(&mut query);

    tracing::debug!(generated_sql = query.sql, params = ?&query.params);

    let rows = build_query_with_params(&query).fetch_all(executor).await?;
    let plan = rows
        .iter()
        .map(|row| row.try_get::<String, _>(0))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((pretty_print(&statement.query_sql()), plan.join("\n")))
}

/// Format the SQL of a statement for people to read.
pub fn pretty_print(query: &sql::string::SQL) -> String {
    sqlformat::format(
        &query.sql,
        &sqlformat::QueryParams::None,
        sqlformat::FormatOptions::default(),
    )
}

/// Create a SQLx query based on our SQL query and bind our parameters to it.
fn build_query_with_params(
    query: &sql::string::SQL,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .params
        .iter()
        .fold(sqlx::query(query.sql.as_str()), |sqlx_query, param| {
            match param {
                sql::string::Param::String(s) => sqlx_query.bind(s),
                sql::string::Param::Value(v) => sqlx_query.bind(v),
            }
        })
}
