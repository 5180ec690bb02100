//! Context factory and per-request context.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::data::product::ProductSet;
use crate::services::ServiceCollection;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid connection string '{connection_string}': {source}")]
    InvalidConnectionString {
        connection_string: String,
        source: sqlx::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const CREATE_PRODUCTS: &str = "CREATE TABLE IF NOT EXISTS products (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT    NOT NULL,
    price REAL    NOT NULL
)";

/// Creates contexts bound to one connection string.
#[derive(Debug, Clone)]
pub struct DbContextFactory {
    connection_string: String,
    pool: SqlitePool,
}

impl DbContextFactory {
    /// Parse `connection_string` and prepare a lazily connecting pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(connection_string: &str, max_connections: u32) -> Result<Self, DataError> {
        let options = SqliteConnectOptions::from_str(connection_string).map_err(|e| {
            DataError::InvalidConnectionString {
                connection_string: connection_string.to_string(),
                source: e,
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);

        Ok(Self {
            connection_string: connection_string.to_string(),
            pool,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn create(&self) -> DbContext {
        DbContext {
            pool: self.pool.clone(),
        }
    }

    /// Create the schema if it does not exist yet.
    pub async fn ensure_created(&self) -> Result<(), DataError> {
        sqlx::query(CREATE_PRODUCTS).execute(&self.pool).await?;
        tracing::info!("Database schema ensured");
        Ok(())
    }

    /// Close every pooled connection. Contexts created afterwards fail on use.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Unit of work for a single request.
#[derive(Debug, Clone)]
pub struct DbContext {
    pool: SqlitePool,
}

impl DbContext {
    pub fn products(&self) -> ProductSet<'_> {
        ProductSet::new(&self.pool)
    }
}

impl ServiceCollection {
    /// Register `factory` as a singleton and `DbContext` as a scoped service.
    pub fn add_db_context(&mut self, factory: DbContextFactory) -> &mut Self {
        self.add_singleton(Arc::new(factory));
        self.add_scoped::<DbContext, _>(|r| Ok(Arc::new(r.get::<DbContextFactory>()?.create())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_connection_string() {
        let err = DbContextFactory::new("sqlite://demo.db?mode=bogus", 1).unwrap_err();
        assert!(matches!(err, DataError::InvalidConnectionString { .. }));
        assert!(err.to_string().contains("mode=bogus"));
    }

    #[tokio::test]
    async fn test_context_registered_as_scoped() {
        let mut services = ServiceCollection::new();
        services.add_db_context(DbContextFactory::new("sqlite::memory:", 1).unwrap());
        let provider = Arc::new(services.build().unwrap());

        let factory = provider.get::<DbContextFactory>().unwrap();
        assert_eq!(factory.connection_string(), "sqlite::memory:");

        let scope = provider.create_scope();
        let a = scope.get::<DbContext>().unwrap();
        let b = scope.get::<DbContext>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(provider.get::<DbContext>().is_err());
    }

    #[tokio::test]
    async fn test_close_marks_pool_closed() {
        let factory = DbContextFactory::new("sqlite::memory:", 1).unwrap();
        factory.ensure_created().await.unwrap();
        factory.close().await;
        assert!(factory.is_closed());
        assert!(factory.create().products().count().await.is_err());
    }
}
