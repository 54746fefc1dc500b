//! Type definitions of a SQL AST representation.

use std::collections::BTreeMap;

/// A top-level SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Update(Update),
    Delete(Delete),
}

/// A WITH clause
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub common_table_expressions: Vec<CommonTableExpression>,
}

/// A single Common Table Expression
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    pub alias: TableAlias,
    pub column_names: Option<Vec<ColumnAlias>>,
    pub select: CTExpr,
}

/// The 'body' side of a Common Table Expression
#[derive(Debug, Clone, PartialEq)]
pub enum CTExpr {
    Insert(Insert),
    Update(Update),
}

/// A SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub with: With,
    pub select_list: SelectList,
    pub from: Option<From>,
    pub where_: Where,
    pub order_by: OrderBy,
    pub limit: Limit,
    pub lock: Option<RowLock>,
}

/// A locking clause at the end of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    ForUpdate,
    ForShare,
}

/// An INSERT clause
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub schema: SchemaName,
    pub table: TableName,
    pub columns: Vec<ColumnName>,
    pub from: InsertFrom,
    pub returning: Option<Returning>,
}

/// Source from which values would be inserted.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertFrom {
    Values(Vec<Vec<MutationValueExpression>>),
    DefaultValues,
}

/// An expression inside an INSERT VALUES clause or UPDATE SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationValueExpression {
    Default,
    Expression(Expression),
}

/// A DELETE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub schema: SchemaName,
    pub table: TableName,
    pub where_: Where,
    pub returning: Option<Returning>,
}

/// An UPDATE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub schema: SchemaName,
    pub table: TableName,
    pub set: BTreeMap<ColumnName, MutationValueExpression>,
    pub where_: Where,
    pub returning: Option<Returning>,
}

/// a RETURNING clause
#[derive(Debug, Clone, PartialEq)]
pub struct Returning(pub SelectList);

/// A select list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    SelectList(Vec<(ColumnAlias, Expression)>),
    SelectStar,
}

/// A FROM clause
#[derive(Debug, Clone, PartialEq)]
pub enum From {
    /// Select from a table reference
    Table {
        reference: TableReference,
        alias: TableAlias,
    },
    /// Select from a subquery
    Select {
        select: Box<Select>,
        alias: TableAlias,
    },
}

/// A WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Where(pub Expression);

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub elements: Vec<OrderByElement>,
}

/// A single element in an ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub target: Expression,
    pub direction: OrderByDirection,
}

/// A direction for a single ORDER BY element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderByDirection {
    Asc,
    Desc,
}

/// LIMIT and OFFSET clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// AND clause
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// OR clause
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// NOT clause
    Not(Box<Expression>),
    /// A binary operation on two scalar expression
    BinaryOperation {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    /// A binary operation on a scalar expression and an array of scalar expressions
    BinaryArrayOperation {
        left: Box<Expression>,
        operator: BinaryArrayOperator,
        right: Vec<Expression>,
    },
    /// An unary operation on a scalar expression
    UnaryOperation {
        expression: Box<Expression>,
        operator: UnaryOperator,
    },
    /// A scalar function call
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    /// A json_build_object function call
    JsonBuildObject(BTreeMap<String, Expression>),
    /// A row_to_json function call
    RowToJson(TableReference),
    /// A column of the table being queried
    ColumnReference(ColumnName),
    /// An irreducible value
    Value(Value),
    /// A COUNT clause
    Count(CountType),
    /// A SELECT returning a single row and column
    CorrelatedSubSelect(Box<Select>),
}

/// An unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    IsNull,
    IsNotNull,
}

/// A binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
    NotLike,
    CaseInsensitiveLike,
    NotCaseInsensitiveLike,
}

/// A binary operator when the rhs is an array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArrayOperator {
    In,
    NotIn,
}

/// A scalar function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Coalesce,
    JsonAgg,
}

/// COUNT clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountType {
    Star,
}

/// Value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i64),
    Float8(f64),
    Bool(bool),
    String(String),
    Null,
    /// A string literal cast to a database type, for when the user passes
    /// e.g. timestamps or uuids as strings.
    Cast {
        value: String,
        r#type: ScalarTypeName,
    },
    JsonValue(serde_json::Value),
    EmptyJsonArray,
}

/// The name of a database scalar type, as it appears in a CAST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarTypeName(pub String);

/// A database schema name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName(pub String);

/// A database table name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(pub String);

/// A reference to a table. Used when we want to query it,
/// for example in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableReference {
    /// refers to a db table object name
    DBTable {
        schema: SchemaName,
        table: TableName,
    },
    /// refers to an alias we created
    AliasedTable(TableAlias),
}

/// A database table's column name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnName(pub String);

/// aliases that we give to relations
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableAlias {
    pub name: String,
}

/// aliases that we give to columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    pub name: String,
}
