//! Convert a SQL AST to a low-level SQL string.

use super::ast::*;
use super::helpers;
use super::string::*;

/// Render a list of items separated by `, `.
fn comma_separated<T>(sql: &mut SQL, items: &[T], mut render: impl FnMut(&T, &mut SQL)) {
    for (index, item) in items.iter().enumerate() {
        render(item, sql);
        if index < (items.len() - 1) {
            sql.append_syntax(", ");
        }
    }
}

// Convert to SQL strings

impl Statement {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Statement::Select(select) => select.to_sql(sql),
            Statement::Update(update) => update.to_sql(sql),
            Statement::Delete(delete) => delete.to_sql(sql),
        }
    }

    /// Render this statement into a fresh SQL string.
    pub fn query_sql(&self) -> SQL {
        let mut sql = SQL::new();
        self.to_sql(&mut sql);
        sql
    }
}

impl With {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.common_table_expressions.is_empty() {
            sql.append_syntax("WITH ");
            comma_separated(sql, &self.common_table_expressions, |cte, sql| {
                cte.to_sql(sql);
            });
            sql.append_syntax(" ");
        }
    }
}

impl CommonTableExpression {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.alias.to_sql(sql);
        match &self.column_names {
            None => {}
            Some(names) => {
                sql.append_syntax("(");
                comma_separated(sql, names, ColumnAlias::to_sql);
                sql.append_syntax(")");
            }
        }

        sql.append_syntax(" AS (");
        self.select.to_sql(sql);
        sql.append_syntax(")");
    }
}

impl CTExpr {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            CTExpr::Insert(insert) => insert.to_sql(sql),
            CTExpr::Update(update) => update.to_sql(sql),
        }
    }
}

impl SelectList {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            SelectList::SelectList(select_list) => {
                comma_separated(sql, select_list, |(col, expr), sql| {
                    expr.to_sql(sql);
                    sql.append_syntax(" AS ");
                    col.to_sql(sql);
                });
            }
            SelectList::SelectStar => {
                sql.append_syntax("*");
            }
        }
    }
}

impl Select {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.with.to_sql(sql);

        sql.append_syntax("SELECT ");

        self.select_list.to_sql(sql);

        if let Some(from) = &self.from {
            sql.append_syntax(" FROM ");
            from.to_sql(sql);
        }

        self.where_.to_sql(sql);

        self.order_by.to_sql(sql);

        self.limit.to_sql(sql);

        if let Some(lock) = &self.lock {
            lock.to_sql(sql);
        }
    }
}

impl RowLock {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            RowLock::ForUpdate => sql.append_syntax(" FOR UPDATE"),
            RowLock::ForShare => sql.append_syntax(" FOR SHARE"),
        }
    }
}

impl Insert {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("INSERT INTO ");
        self.schema.to_sql(sql);
        sql.append_syntax(".");
        self.table.to_sql(sql);

        match &self.from {
            InsertFrom::DefaultValues => sql.append_syntax(" DEFAULT VALUES"),
            InsertFrom::Values(rows) => {
                sql.append_syntax(" (");
                comma_separated(sql, &self.columns, ColumnName::to_sql);
                sql.append_syntax(") VALUES ");
                comma_separated(sql, rows, |row, sql| {
                    sql.append_syntax("(");
                    comma_separated(sql, row, MutationValueExpression::to_sql);
                    sql.append_syntax(")");
                });
            }
        }

        if let Some(returning) = &self.returning {
            returning.to_sql(sql);
        }
    }
}

impl MutationValueExpression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            MutationValueExpression::Default => sql.append_syntax("DEFAULT"),
            MutationValueExpression::Expression(expression) => expression.to_sql(sql),
        }
    }
}

impl Update {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("UPDATE ");
        self.schema.to_sql(sql);
        sql.append_syntax(".");
        self.table.to_sql(sql);
        sql.append_syntax(" SET ");

        let set: Vec<_> = self.set.iter().collect();
        comma_separated(sql, &set, |(column, value), sql| {
            column.to_sql(sql);
            sql.append_syntax(" = ");
            value.to_sql(sql);
        });

        self.where_.to_sql(sql);

        if let Some(returning) = &self.returning {
            returning.to_sql(sql);
        }
    }
}

impl Delete {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_syntax("DELETE FROM ");
        self.schema.to_sql(sql);
        sql.append_syntax(".");
        self.table.to_sql(sql);

        self.where_.to_sql(sql);

        if let Some(returning) = &self.returning {
            returning.to_sql(sql);
        }
    }
}

impl Returning {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Returning(select_list) = self;
        sql.append_syntax(" RETURNING ");
        select_list.to_sql(sql);
    }
}

impl From {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            From::Table { reference, alias } => {
                reference.to_sql(sql);
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
            From::Select { select, alias } => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
                sql.append_syntax(" AS ");
                alias.to_sql(sql);
            }
        }
    }
}

impl Where {
    pub fn to_sql(&self, sql: &mut SQL) {
        let Where(expression) = self;
        if *expression != helpers::true_expr() {
            sql.append_syntax(" WHERE ");
            expression.to_sql(sql);
        }
    }
}

// scalars
impl Expression {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Expression::ColumnReference(column_name) => column_name.to_sql(sql),
            Expression::Value(value) => value.to_sql(sql),
            Expression::And { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" AND ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Or { left, right } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                sql.append_syntax(" OR ");
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Not(expr) => {
                sql.append_syntax("NOT ");
                expr.to_sql(sql);
            }
            Expression::BinaryOperation {
                left,
                operator,
                right,
            } => {
                sql.append_syntax("(");
                left.to_sql(sql);
                operator.to_sql(sql);
                right.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::BinaryArrayOperation {
                left,
                operator,
                right,
            } => {
                // `x IN ()` is not valid SQL.
                if right.is_empty() {
                    match operator {
                        BinaryArrayOperator::In => helpers::false_expr().to_sql(sql),
                        BinaryArrayOperator::NotIn => helpers::true_expr().to_sql(sql),
                    }
                } else {
                    sql.append_syntax("(");
                    left.to_sql(sql);
                    operator.to_sql(sql);
                    sql.append_syntax("(");
                    comma_separated(sql, right, Expression::to_sql);
                    sql.append_syntax(")");
                    sql.append_syntax(")");
                }
            }
            Expression::UnaryOperation {
                expression,
                operator,
            } => {
                sql.append_syntax("(");
                expression.to_sql(sql);
                operator.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::FunctionCall { function, args } => {
                function.to_sql(sql);
                sql.append_syntax("(");
                comma_separated(sql, args, Expression::to_sql);
                sql.append_syntax(")");
            }
            Expression::JsonBuildObject(map) => {
                sql.append_syntax("json_build_object");
                sql.append_syntax("(");

                let items: Vec<_> = map.iter().collect();
                comma_separated(sql, &items, |(label, item), sql| {
                    sql.append_syntax("'");
                    sql.append_syntax(&label.replace('\'', "''"));
                    sql.append_syntax("'");
                    sql.append_syntax(", ");
                    item.to_sql(sql);
                });

                sql.append_syntax(")");
            }
            Expression::RowToJson(table) => {
                sql.append_syntax("row_to_json");
                sql.append_syntax("(");
                table.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::Count(count_type) => {
                sql.append_syntax("COUNT");
                sql.append_syntax("(");
                count_type.to_sql(sql);
                sql.append_syntax(")");
            }
            Expression::CorrelatedSubSelect(select) => {
                sql.append_syntax("(");
                select.to_sql(sql);
                sql.append_syntax(")");
            }
        }
    }
}

impl UnaryOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            UnaryOperator::IsNull => sql.append_syntax(" IS NULL"),
            UnaryOperator::IsNotNull => sql.append_syntax(" IS NOT NULL"),
        }
    }
}

impl BinaryOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            BinaryOperator::Equals => sql.append_syntax(" = "),
            BinaryOperator::NotEquals => sql.append_syntax(" <> "),
            BinaryOperator::GreaterThan => sql.append_syntax(" > "),
            BinaryOperator::GreaterThanOrEqualTo => sql.append_syntax(" >= "),
            BinaryOperator::LessThan => sql.append_syntax(" < "),
            BinaryOperator::LessThanOrEqualTo => sql.append_syntax(" <= "),
            BinaryOperator::Like => sql.append_syntax(" LIKE "),
            BinaryOperator::NotLike => sql.append_syntax(" NOT LIKE "),
            BinaryOperator::CaseInsensitiveLike => sql.append_syntax(" ILIKE "),
            BinaryOperator::NotCaseInsensitiveLike => sql.append_syntax(" NOT ILIKE "),
        }
    }
}

impl BinaryArrayOperator {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            BinaryArrayOperator::In => sql.append_syntax(" IN "),
            BinaryArrayOperator::NotIn => sql.append_syntax(" NOT IN "),
        }
    }
}

impl Function {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            Function::Coalesce => sql.append_syntax("coalesce"),
            Function::JsonAgg => sql.append_syntax("json_agg"),
        }
    }
}

impl CountType {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            CountType::Star => sql.append_syntax("*"),
        }
    }
}

impl Value {
    pub fn to_sql(&self, sql: &mut SQL) {
        match &self {
            Value::EmptyJsonArray => sql.append_syntax("'[]'"),
            Value::Int8(i) => sql.append_syntax(format!("{i}").as_str()),
            Value::Float8(n) => sql.append_syntax(format!("{n}").as_str()),
            Value::String(s) => sql.append_param(Param::String(s.clone())),
            Value::Bool(true) => sql.append_syntax("true"),
            Value::Bool(false) => sql.append_syntax("false"),
            Value::Null => sql.append_syntax("NULL"),
            Value::Cast { value, r#type } => {
                sql.append_syntax("CAST(");
                sql.append_param(Param::String(value.clone()));
                sql.append_syntax(" AS ");
                r#type.to_sql(sql);
                sql.append_syntax(")");
            }
            Value::JsonValue(v) => sql.append_param(Param::Value(v.clone())),
        }
    }
}

impl Limit {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self.limit {
            None => (),
            Some(limit) => {
                sql.append_syntax(" LIMIT ");
                sql.append_syntax(format!("{limit}").as_str());
            }
        };
        match self.offset {
            None => (),
            Some(offset) => {
                sql.append_syntax(" OFFSET ");
                sql.append_syntax(format!("{offset}").as_str());
            }
        };
    }
}

impl OrderBy {
    pub fn to_sql(&self, sql: &mut SQL) {
        if !self.elements.is_empty() {
            sql.append_syntax(" ORDER BY ");
            comma_separated(sql, &self.elements, OrderByElement::to_sql);
        }
    }
}

impl OrderByElement {
    pub fn to_sql(&self, sql: &mut SQL) {
        self.target.to_sql(sql);
        self.direction.to_sql(sql);
    }
}

impl OrderByDirection {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            OrderByDirection::Asc => sql.append_syntax(" ASC"),
            OrderByDirection::Desc => sql.append_syntax(" DESC"),
        }
    }
}

// names
impl TableReference {
    pub fn to_sql(&self, sql: &mut SQL) {
        match self {
            TableReference::DBTable { schema, table } => {
                schema.to_sql(sql);
                sql.append_syntax(".");
                table.to_sql(sql);
            }
            TableReference::AliasedTable(alias) => alias.to_sql(sql),
        };
    }
}

impl SchemaName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl TableName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl TableAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ColumnName {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.0);
    }
}

impl ColumnAlias {
    pub fn to_sql(&self, sql: &mut SQL) {
        sql.append_identifier(&self.name);
    }
}

impl ScalarTypeName {
    pub fn to_sql(&self, sql: &mut SQL) {
        // type names come from our own metadata, never from user input
        sql.append_syntax(&self.0);
    }
}
