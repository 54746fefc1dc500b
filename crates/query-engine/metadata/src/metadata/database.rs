//! Metadata information regarding the database and tracked information.

use std::collections::{BTreeMap, BTreeSet};

use enum_iterator::Sequence;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The scalar types supported by the Engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Sequence, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Smallint,
    Integer,
    Bigint,
    Real,
    #[serde(rename = "double precision")]
    DoublePrecision,
    Numeric,
    Character,
    #[serde(rename = "character varying")]
    CharacterVarying,
    Text,
    Json,
    Jsonb,
    Date,
    #[serde(rename = "time with time zone")]
    TimeWithTimeZone,
    #[serde(rename = "time without time zone")]
    TimeWithoutTimeZone,
    #[serde(rename = "timestamp with time zone")]
    TimestampWithTimeZone,
    #[serde(rename = "timestamp without time zone")]
    TimestampWithoutTimeZone,
    Uuid,
    Any,
}

impl ScalarType {
    const EQUALITY_OPERATORS: &'static [ComparisonOperator] = &[
        ComparisonOperator::Equals,
        ComparisonOperator::NotEquals,
        ComparisonOperator::In,
        ComparisonOperator::NotIn,
    ];

    const ORDERING_OPERATORS: &'static [ComparisonOperator] = &[
        ComparisonOperator::LessThan,
        ComparisonOperator::LessThanOrEqualTo,
        ComparisonOperator::GreaterThan,
        ComparisonOperator::GreaterThanOrEqualTo,
    ];

    const STRING_OPERATORS: &'static [ComparisonOperator] = &[
        ComparisonOperator::Like,
        ComparisonOperator::NotLike,
        ComparisonOperator::CaseInsensitiveLike,
        ComparisonOperator::NotCaseInsensitiveLike,
    ];

    /// Returns the complete set of comparison operators for the given type.
    pub fn comparison_operators(&self) -> BTreeSet<ComparisonOperator> {
        let mut operators = BTreeSet::from_iter(Self::EQUALITY_OPERATORS.iter().copied());
        match self {
            ScalarType::Json | ScalarType::Jsonb => {}
            ScalarType::Character
            | ScalarType::CharacterVarying
            | ScalarType::Text
            | ScalarType::Any => {
                operators.extend(Self::ORDERING_OPERATORS.iter().copied());
                operators.extend(Self::STRING_OPERATORS.iter().copied());
            }
            _ => operators.extend(Self::ORDERING_OPERATORS.iter().copied()),
        }
        operators
    }

    /// Whether a string value compared against this type has to be cast first.
    pub fn casts_strings(&self) -> bool {
        !matches!(
            self,
            ScalarType::Character
                | ScalarType::CharacterVarying
                | ScalarType::Text
                | ScalarType::Any
        )
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ScalarType::DoublePrecision => write!(f, "double precision"),
            ScalarType::CharacterVarying => write!(f, "character varying"),
            ScalarType::TimeWithTimeZone => write!(f, "time with time zone"),
            ScalarType::TimeWithoutTimeZone => write!(f, "time without time zone"),
            ScalarType::TimestampWithTimeZone => write!(f, "timestamp with time zone"),
            ScalarType::TimestampWithoutTimeZone => write!(f, "timestamp without time zone"),
            _ => write!(f, "{}", format!("{self:?}").to_lowercase()),
        }
    }
}

/// The complete list of comparison operators a query filter may use on a field.
/// Not all of these are supported for every type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Sequence,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    In,
    NotIn,
    Like,
    NotLike,
    CaseInsensitiveLike,
    NotCaseInsensitiveLike,
}

impl ComparisonOperator {
    /// The operator key as written in a query filter.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals => "$eq",
            Self::NotEquals => "$ne",
            Self::LessThan => "$lt",
            Self::LessThanOrEqualTo => "$lte",
            Self::GreaterThan => "$gt",
            Self::GreaterThanOrEqualTo => "$gte",
            Self::In => "$in",
            Self::NotIn => "$nin",
            Self::Like => "$like",
            Self::NotLike => "$notLike",
            Self::CaseInsensitiveLike => "$iLike",
            Self::NotCaseInsensitiveLike => "$notILike",
        }
    }

    /// Look up an operator by its filter key.
    pub fn from_name(name: &str) -> Option<Self> {
        enum_iterator::all::<ComparisonOperator>().find(|operator| operator.name() == name)
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Mapping from a "table" name to its information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TablesInfo(pub BTreeMap<String, TableInfo>);

impl TablesInfo {
    pub fn empty() -> Self {
        TablesInfo(BTreeMap::new())
    }
}

/// Information about a database table (or any other kind of relation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    pub table_name: String,
    /// The column holding each record's unique identifier.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Known column types. Columns that are not listed are still queryable,
    /// their values are bound without a cast.
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnInfo>,
}

impl TableInfo {
    /// A table in the `public` schema keyed by an `id` column, with no column types.
    pub fn new(table_name: impl Into<String>) -> Self {
        TableInfo {
            schema_name: default_schema_name(),
            table_name: table_name.into(),
            primary_key: default_primary_key(),
            columns: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, r#type: ScalarType) -> Self {
        let name = name.into();
        self.columns.insert(
            name.clone(),
            ColumnInfo {
                name,
                r#type,
                nullable: Nullable::Nullable,
            },
        );
        self
    }

    /// The declared type of a column, if any.
    pub fn column_type(&self, column: &str) -> Option<ScalarType> {
        self.columns.get(column).map(|info| info.r#type)
    }
}

fn default_schema_name() -> String {
    "public".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Can this column contain null values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Nullable {
    #[default]
    Nullable,
    NonNullable,
}

/// Information about a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    pub r#type: ScalarType,
    #[serde(default)]
    pub nullable: Nullable,
}
