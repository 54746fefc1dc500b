//! Transient state used by the record services.
//!
//! This is initialized on startup.

use thiserror::Error;
use tracing::{info_span, Instrument};

use crud_sql_configuration::{Configuration, PoolSettings};
use query_engine_execution::metrics;
use query_engine_execution::PostgresModel;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error;
use crate::service::{RecordService, ServiceOptions};

/// State shared by the record services.
#[derive(Debug, Clone)]
pub struct State {
    pub pool: PgPool,
    pub metrics: metrics::Metrics,
}

impl State {
    /// A record service for the configured service `name`.
    pub fn service(
        &self,
        configuration: &Configuration,
        name: &str,
    ) -> Result<RecordService<PostgresModel>, error::Error> {
        let service = configuration.service(name).ok_or_else(|| {
            error::Error::Configuration(format!("there is no service named '{name}'"))
        })?;
        let model = PostgresModel::new(self.pool.clone(), service.table.clone());
        Ok(
            RecordService::new(ServiceOptions::from_configuration(model, service))?
                .with_metrics(self.metrics.clone()),
        )
    }
}

/// Create a connection pool and wrap it inside a State.
pub async fn create_state(
    configuration: &Configuration,
    metrics_registry: &mut prometheus::Registry,
) -> Result<State, InitializationError> {
    let pool = create_pool(&configuration.connection_uri, &configuration.pool_settings)
        .instrument(info_span!("Create connection pool"))
        .await?;

    let metrics = async {
        let metrics_inner = metrics::Metrics::initialize(metrics_registry)
            .map_err(InitializationError::MetricsError)?;
        metrics_inner.update_pool_metrics(&pool);
        Ok(metrics_inner)
    }
    .instrument(info_span!("Setup metrics"))
    .await?;

    Ok(State { pool, metrics })
}

/// Create a connection pool with the configured settings.
/// - <https://docs.rs/sqlx/latest/sqlx/pool/struct.PoolOptions.html>
async fn create_pool(
    connection_uri: &str,
    pool_settings: &PoolSettings,
) -> Result<PgPool, InitializationError> {
    PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(pool_settings.pool_timeout))
        .idle_timeout(
            pool_settings
                .idle_timeout
                .map(std::time::Duration::from_secs),
        )
        .max_lifetime(
            pool_settings
                .connection_lifetime
                .map(std::time::Duration::from_secs),
        )
        .connect(connection_uri)
        .await
        .map_err(InitializationError::UnableToCreatePool)
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(prometheus::Error),
}
