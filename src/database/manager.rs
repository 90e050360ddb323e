use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::postgres::PgQuarterStore;
use crate::database::repository::QuarterStore;

/// Errors from the quarter store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// Unique-constraint violations become `Conflict`, everything else stays a driver error
    pub fn from_write(err: sqlx::Error, what: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
            _ => StoreError::Sqlx(err),
        }
    }
}

/// Builds the connection pool held in the application state
pub struct DatabaseManager;

impl DatabaseManager {
    /// Create a lazily connecting pool; nothing touches the network until the first request
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

        let options: PgConnectOptions = url.parse().map_err(|_| StoreError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy_with(options);

        info!("Created database pool for: {}", Self::redacted_url(url)?);
        Ok(pool)
    }

    /// Store for the application state, or `None` when `DATABASE_URL` is unset
    pub fn store(config: &DatabaseConfig) -> Result<Option<Arc<dyn QuarterStore>>, StoreError> {
        match Self::connect_lazy(config) {
            Ok(pool) => Ok(Some(Arc::new(PgQuarterStore::new(pool)))),
            Err(StoreError::ConfigMissing(var)) => {
                warn!("{} not set; quarter endpoints will answer with a configuration error", var);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Connection string with the password removed, for logs
    fn redacted_url(url: &str) -> Result<String, StoreError> {
        let mut parsed = url::Url::parse(url).map_err(|_| StoreError::InvalidDatabaseUrl)?;
        if parsed.password().is_some() {
            parsed
                .set_password(Some("***"))
                .map_err(|_| StoreError::InvalidDatabaseUrl)?;
        }
        Ok(parsed.into())
    }
}
