//! Version 1 of the configuration format: the services, the tables they are bound to, and how
//! to reach the database.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use tokio::fs;

use query_engine_metadata::metadata::{self, database};

use crate::configuration::{Configuration, ServiceRuntimeConfiguration};
use crate::environment::Environment;
use crate::error::{
    MakeRuntimeConfigurationError, ParseConfigurationError, WriteParsedConfigurationError,
};
use crate::values::{ConnectionUri, Pagination, PoolSettings, Secret};

const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "CRUD_SQL_CONNECTION_URI";

const COLUMNS_QUERY: &str = "
    select
        coalesce(
            json_object_agg(
                c.column_name,
                json_build_object(
                    'name', c.column_name,
                    'type', c.data_type,
                    'nullable', case when c.is_nullable = 'YES' then 'Nullable' else 'NonNullable' end
                )
            ),
            '{}'::json
        ) as columns
    from information_schema.columns c
    where c.table_schema = $1 and c.table_name = $2
";

/// Initial configuration, just enough to connect to a database and bind record services to its
/// tables.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    // Connection string for a Postgres-compatible database
    #[serde(default = "default_connection_uri")]
    pub connection_uri: ConnectionUri,
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    #[serde(default)]
    pub pool_settings: PoolSettings,
    #[serde(default)]
    pub metadata: metadata::Metadata,
    /// The record services, by name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfiguration>,
}

/// A record service bound to one table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfiguration {
    /// The key of the table in `metadata.tables`.
    pub table: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Pagination::is_disabled")]
    pub paginate: Pagination,
}

fn default_connection_uri() -> ConnectionUri {
    ConnectionUri(Secret::FromEnvironment {
        variable: DEFAULT_CONNECTION_URI_VARIABLE.into(),
    })
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            connection_uri: default_connection_uri(),
            pool_settings: PoolSettings::default(),
            metadata: metadata::Metadata::default(),
            services: BTreeMap::new(),
        }
    }
}

/// Resolve a secret, borrowing it when it is written inline.
fn read_secret<'a>(
    secret: &'a Secret,
    environment: &impl Environment,
) -> Result<Cow<'a, str>, crate::environment::Error> {
    match secret {
        Secret::Plain(value) => Ok(Cow::Borrowed(value)),
        Secret::FromEnvironment { variable } => Ok(Cow::Owned(environment.read(variable)?)),
    }
}

/// The column as the introspection query reports it, before its type is resolved.
#[derive(Deserialize)]
struct IntrospectedColumn {
    name: String,
    r#type: String,
    nullable: database::Nullable,
}

/// Introspect the database to fill in the column types of every configured table.
///
/// Types we do not know are recorded as `any`, whose values are bound without a cast.
pub async fn configure(
    args: &ParsedConfiguration,
    environment: impl Environment,
) -> anyhow::Result<ParsedConfiguration> {
    let ConnectionUri(secret) = &args.connection_uri;
    let connection_uri = read_secret(secret, &environment)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&connection_uri)
        .await?;

    let mut tables = BTreeMap::new();
    for (name, table) in &args.metadata.tables.0 {
        let row = sqlx::query(COLUMNS_QUERY)
            .bind(&table.schema_name)
            .bind(&table.table_name)
            .fetch_one(&pool)
            .await?;
        let columns: serde_json::Value = row.try_get(0)?;
        let introspected: BTreeMap<String, IntrospectedColumn> = serde_json::from_value(columns)?;

        let columns = introspected
            .into_iter()
            .map(|(column_name, column)| {
                let r#type = serde_json::from_value(serde_json::Value::String(column.r#type))
                    .unwrap_or(database::ScalarType::Any);
                (
                    column_name,
                    database::ColumnInfo {
                        name: column.name,
                        r#type,
                        nullable: column.nullable,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        tracing::info!(table = %name, columns = columns.len(), "introspected table");

        tables.insert(
            name.clone(),
            database::TableInfo {
                columns,
                ..table.clone()
            },
        );
    }

    Ok(ParsedConfiguration {
        metadata: metadata::Metadata {
            tables: database::TablesInfo(tables),
        },
        ..args.clone()
    })
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents = fs::read_to_string(&configuration_file).await?;

    let parsed_config: ParsedConfiguration = serde_json::from_str(&configuration_file_contents)
        .map_err(|error| ParseConfigurationError::ParseError {
            file_path: configuration_file.clone(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;

    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion(
            parsed_config.version,
        ));
    }

    Ok(parsed_config)
}

/// Write the parsed configuration into a directory on disk, along with its JSON schema.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let out_dir = out_dir.as_ref();
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(WriteParsedConfigurationError::DirectoryIsNotADirectory(
            out_dir.to_owned(),
        ));
    }
    fs::create_dir_all(out_dir).await?;

    let configuration_file = out_dir.join(CONFIGURATION_FILENAME);
    fs::write(
        &configuration_file,
        serde_json::to_string_pretty(&parsed_config)? + "\n",
    )
    .await?;

    let schema_file = out_dir.join(CONFIGURATION_JSONSCHEMA_FILENAME);
    let schema = schemars::schema_for!(ParsedConfiguration);
    fs::write(&schema_file, serde_json::to_string_pretty(&schema)? + "\n").await?;

    Ok(())
}

/// Resolve secrets and check every service against the metadata, producing the runtime
/// configuration.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let ConnectionUri(secret) = &parsed_config.connection_uri;
    let connection_uri = read_secret(secret, &environment)
        .map_err(|error| MakeRuntimeConfigurationError::MissingEnvironmentVariable {
            file_path: CONFIGURATION_FILENAME.into(),
            message: error.to_string(),
        })?
        .into_owned();

    let services = parsed_config
        .services
        .iter()
        .map(|(name, service)| {
            let table = parsed_config
                .metadata
                .tables
                .0
                .get(&service.table)
                .ok_or_else(|| MakeRuntimeConfigurationError::UnknownTable {
                    service: name.clone(),
                    table: service.table.clone(),
                })?;

            if let Pagination {
                default: Some(default),
                max: Some(max),
            } = service.paginate
            {
                if default > max {
                    return Err(MakeRuntimeConfigurationError::InvalidPagination {
                        service: name.clone(),
                        default,
                        max,
                    });
                }
            }

            Ok((
                name.clone(),
                ServiceRuntimeConfiguration {
                    table: table.clone(),
                    paginate: service.paginate,
                },
            ))
        })
        .collect::<Result<BTreeMap<_, _>, MakeRuntimeConfigurationError>>()?;

    Ok(Configuration {
        metadata: parsed_config.metadata,
        services,
        pool_settings: parsed_config.pool_settings,
        connection_uri,
    })
}
