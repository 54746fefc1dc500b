//! Handle sorting/order by translation.

use query_engine_sql::sql;

use crate::translation::filter::SortDirection;

/// Convert sort directives to a SQL ORDER BY clause, keeping their order.
pub fn translate_order_by(sort: &[(String, SortDirection)]) -> sql::ast::OrderBy {
    sql::ast::OrderBy {
        elements: sort
            .iter()
            .map(|(field, direction)| sql::ast::OrderByElement {
                target: sql::helpers::column(field.clone()),
                direction: match direction {
                    SortDirection::Ascending => sql::ast::OrderByDirection::Asc,
                    SortDirection::Descending => sql::ast::OrderByDirection::Desc,
                },
            })
            .collect(),
    }
}
