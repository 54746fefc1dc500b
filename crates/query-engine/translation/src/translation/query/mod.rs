//! Translate a normalized filter to the parts of a SQL query.

pub mod filtering;
pub mod mutation;
pub mod root;
pub mod sorting;
pub mod values;

use query_engine_metadata::metadata::{database, ComparisonOperator};
use query_engine_sql::sql;

use crate::translation::error::Error;
use crate::translation::filter::NormalizedFilter;

/// What to fetch from a table: which rows, in which order, how many, and which columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub where_: sql::ast::Where,
    pub order_by: sql::ast::OrderBy,
    pub limit: sql::ast::Limit,
    /// `None` selects every column.
    pub attributes: Option<Vec<sql::ast::ColumnName>>,
}

impl FindQuery {
    /// Every row, every column, in no particular order.
    pub fn all() -> Self {
        FindQuery {
            where_: sql::ast::Where(sql::helpers::empty_where()),
            order_by: sql::helpers::empty_order_by(),
            limit: sql::helpers::empty_limit(),
            attributes: None,
        }
    }

    /// The same query further restricted by `condition`.
    #[must_use]
    pub fn constrained(mut self, condition: sql::ast::Expression) -> Self {
        self.where_ = constrain(self.where_, condition);
        self
    }
}

impl Default for FindQuery {
    fn default() -> Self {
        FindQuery::all()
    }
}

/// Translate a normalized filter to a query on `table`.
pub fn translate(
    filter: &NormalizedFilter,
    table: &database::TableInfo,
) -> Result<FindQuery, Error> {
    let where_ = sql::ast::Where(filtering::translate_predicates(table, &filter.predicates)?);
    let order_by = sorting::translate_order_by(&filter.sort);
    let limit = sql::ast::Limit {
        limit: filter.limit,
        offset: if filter.skip == 0 {
            None
        } else {
            Some(filter.skip)
        },
    };
    let attributes = filter.select.as_ref().map(|fields| {
        fields
            .iter()
            .map(|field| sql::ast::ColumnName(field.clone()))
            .collect()
    });

    let query = FindQuery {
        where_,
        order_by,
        limit,
        attributes,
    };

    // log and return
    tracing::debug!(?query, "translated filter");
    Ok(query)
}

/// `<primary key> = id`
pub fn id_equals(
    table: &database::TableInfo,
    id: &serde_json::Value,
) -> Result<sql::ast::Expression, Error> {
    filtering::translate_comparison(table, &table.primary_key, ComparisonOperator::Equals, id)
}

/// `<primary key> IN (ids)`. Holds for no row when `ids` is empty.
pub fn id_in(
    table: &database::TableInfo,
    ids: &[serde_json::Value],
) -> Result<sql::ast::Expression, Error> {
    filtering::translate_comparison(
        table,
        &table.primary_key,
        ComparisonOperator::In,
        &serde_json::Value::Array(ids.to_vec()),
    )
}

/// AND a condition onto a where clause.
pub fn constrain(where_: sql::ast::Where, condition: sql::ast::Expression) -> sql::ast::Where {
    let sql::ast::Where(expression) = where_;
    sql::ast::Where(sql::helpers::conjoin([expression, condition]))
}
