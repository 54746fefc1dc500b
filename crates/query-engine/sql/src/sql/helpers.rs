//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;
use std::collections::BTreeMap;

/// The alias of the single column every json-returning statement produces.
pub const RESULT_COLUMN: &str = "universe";
/// The alias of the subquery whose rows are aggregated into json.
pub const ROWS_ALIAS: &str = "_rows";
/// The alias of the CTE holding the rows returned by a mutation.
pub const MUTATED_ALIAS: &str = "_mutated";

// Empty clauses //

/// An empty `WITH` clause.
pub fn empty_with() -> With {
    With {
        common_table_expressions: vec![],
    }
}

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

// Boolean combinators //

/// AND together a list of expressions. The empty conjunction is `true`.
pub fn conjoin(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions
        .into_iter()
        .filter(|expr| *expr != true_expr())
        .reduce(|left, right| Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        })
        .unwrap_or_else(true_expr)
}

/// OR together a list of expressions. The empty disjunction is `false`.
pub fn disjoin(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions
        .into_iter()
        .reduce(|left, right| Expression::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
        .unwrap_or_else(false_expr)
}

// Aliasing //

/// Create table aliases using this function so we build everything in one place.
pub fn make_table_alias(name: impl Into<String>) -> TableAlias {
    TableAlias { name: name.into() }
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: impl Into<String>) -> ColumnAlias {
    ColumnAlias { name: name.into() }
}

/// A reference to a column of the queried table.
pub fn column(name: impl Into<String>) -> Expression {
    Expression::ColumnReference(ColumnName(name.into()))
}

/// Select a list of columns under their own names.
pub fn select_columns(columns: &[ColumnName]) -> SelectList {
    SelectList::SelectList(
        columns
            .iter()
            .map(|ColumnName(name)| (make_column_alias(name.clone()), column(name.clone())))
            .collect(),
    )
}

/// A `FROM` a database table, aliased by its own name.
pub fn from_table(schema: &SchemaName, table: &TableName) -> From {
    From::Table {
        reference: TableReference::DBTable {
            schema: schema.clone(),
            table: table.clone(),
        },
        alias: make_table_alias(table.0.clone()),
    }
}

// SELECTs //

/// Build a simple select with a select list and the rest are empty.
pub fn simple_select(select_list: Vec<(ColumnAlias, Expression)>) -> Select {
    Select {
        with: empty_with(),
        select_list: SelectList::SelectList(select_list),
        from: None,
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
        lock: None,
    }
}

/// Build a simple select *
pub fn star_select(from: From) -> Select {
    Select {
        with: empty_with(),
        select_list: SelectList::SelectStar,
        from: Some(from),
        where_: Where(empty_where()),
        order_by: empty_order_by(),
        limit: empty_limit(),
        lock: None,
    }
}

/// `SELECT COUNT(*) FROM <from> WHERE <where>`
pub fn count_select(from: From, where_: Where) -> Select {
    let mut select = simple_select(vec![(
        make_column_alias("count"),
        Expression::Count(CountType::Star),
    )]);
    select.from = Some(from);
    select.where_ = where_;
    select
}

/// Aggregate the rows of `rows` into a json array, `[]` when there are none:
///
/// `SELECT coalesce(json_agg(row_to_json("_rows")), '[]') FROM (<rows>) AS "_rows"`
pub fn json_agg_select(rows: From) -> Select {
    let alias = match &rows {
        From::Table { alias, .. } | From::Select { alias, .. } => alias.clone(),
    };
    let mut select = simple_select(vec![(
        make_column_alias(RESULT_COLUMN),
        Expression::FunctionCall {
            function: Function::Coalesce,
            args: vec![
                Expression::FunctionCall {
                    function: Function::JsonAgg,
                    args: vec![Expression::RowToJson(TableReference::AliasedTable(alias))],
                },
                Expression::Value(Value::EmptyJsonArray),
            ],
        },
    )]);
    select.from = Some(rows);
    select
}

/// Given a select of rows and a select counting the matching rows (without limit), combine
/// them into one select returning a single json object `{"count": .., "rows": [..]}`.
pub fn select_rows_and_count(rows: Select, count: Select) -> Select {
    let rows_json = json_agg_select(From::Select {
        select: Box::new(rows),
        alias: make_table_alias(ROWS_ALIAS),
    });

    let mut json_items = BTreeMap::new();
    json_items.insert(
        "count".to_string(),
        Expression::CorrelatedSubSelect(Box::new(count)),
    );
    json_items.insert(
        "rows".to_string(),
        Expression::CorrelatedSubSelect(Box::new(rows_json)),
    );

    simple_select(vec![(
        make_column_alias(RESULT_COLUMN),
        Expression::JsonBuildObject(json_items),
    )])
}

/// Wrap a mutation in a CTE and return the rows it produced as a json array.
pub fn select_mutated_rows(mutation: CTExpr) -> Select {
    let alias = make_table_alias(MUTATED_ALIAS);
    let mut select = json_agg_select(From::Table {
        reference: TableReference::AliasedTable(alias.clone()),
        alias: alias.clone(),
    });
    select.with = With {
        common_table_expressions: vec![CommonTableExpression {
            alias,
            column_names: None,
            select: mutation,
        }],
    };
    select
}
