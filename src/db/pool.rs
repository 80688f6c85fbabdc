//! Database connection pool abstraction
//!
//! This module provides a unified interface for database operations that
//! works with both PostgreSQL and MySQL backends. The appropriate pool is
//! created based on the configuration.
//!
//! Pools are created lazily: construction never touches the network, and the
//! first statement issued establishes the connection. [`DatabasePool::connect_check`]
//! exists for callers (health checks, the installation path) that need to
//! verify connectivity up front.

use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    postgres::{PgPool, PgPoolOptions},
};
use std::sync::Arc;

use super::DbError;
use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over the two supported backends.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64, DbError>;

    /// Verify one pooled connection can be acquired and released.
    ///
    /// Idempotent; the underlying driver error is attached on failure.
    async fn connect_check(&self) -> Result<(), DbError>;

    /// Health-check probe: never fails, returns `false` on any error.
    async fn test_connection(&self) -> bool {
        self.connect_check().await.is_ok()
    }

    /// Close the connection pool; calling twice is a no-op
    async fn close(&self);

    /// Get the database driver type
    fn driver(&self) -> DatabaseDriver;

    /// Get the underlying PostgreSQL pool if this is a PostgreSQL connection
    fn as_postgres(&self) -> Option<&PgPool>;

    /// Get the underlying MySQL pool if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// PostgreSQL connection pool implementation
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    /// Create a new lazily-connected PostgreSQL pool
    pub fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect_lazy(&config.connection_url())
            .map_err(DbError::connection)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests and embedders construct their own)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for PostgresDatabase {
    async fn execute(&self, query: &str) -> Result<u64, DbError> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::query(query.to_string(), e))?;
        Ok(result.rows_affected())
    }

    async fn connect_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::connection)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Postgres
    }

    fn as_postgres(&self) -> Option<&PgPool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    /// Create a new lazily-connected MySQL pool
    pub fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(20)
            .connect_lazy(&config.connection_url())
            .map_err(DbError::connection)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests and embedders construct their own)
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64, DbError> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::query(query.to_string(), e))?;
        Ok(result.rows_affected())
    }

    async fn connect_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::connection)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_postgres(&self) -> Option<&PgPool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
///
/// Selects the backend from `config.driver` and builds the matching pool.
/// Unknown driver names never reach this point: they fail at configuration
/// parse time with `ConfigError::UnsupportedDriver`.
pub fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool, DbError> {
    match config.driver {
        DatabaseDriver::Postgres => {
            let db = PostgresDatabase::new(config)?;
            Ok(Arc::new(db))
        }
        DatabaseDriver::Mysql => {
            let db = MysqlDatabase::new(config)?;
            Ok(Arc::new(db))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postgres_config() -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Postgres,
            ..DatabaseConfig::default()
        }
    }

    fn mysql_config() -> DatabaseConfig {
        DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            port: 3306,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_postgres_pool_creation_is_lazy() {
        // No server is needed: construction only parses the URL.
        let pool = create_pool(&postgres_config()).expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Postgres);
        assert!(pool.as_postgres().is_some());
        assert!(pool.as_mysql().is_none());
    }

    #[tokio::test]
    async fn test_mysql_pool_creation_is_lazy() {
        let pool = create_pool(&mysql_config()).expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
        assert!(pool.as_postgres().is_none());
    }

    #[tokio::test]
    async fn test_test_connection_is_false_without_server() {
        // Points at a closed port; the probe must swallow the failure.
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..postgres_config()
        };
        let pool = create_pool(&config).expect("Failed to create pool");
        assert!(!pool.test_connection().await);
    }

    #[tokio::test]
    async fn test_connect_check_error_carries_driver_message() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..postgres_config()
        };
        let pool = create_pool(&config).expect("Failed to create pool");
        let err = pool.connect_check().await.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let pool = create_pool(&postgres_config()).expect("Failed to create pool");
        pool.close().await;
        pool.close().await;
    }

    // Live-backend tests are gated on a running server.
    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_connect_check() {
        let url = std::env::var("POSTGRES_TEST_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/quotekit_test".to_string());
        let pool = PgPoolOptions::new()
            .connect_lazy(&url)
            .expect("Failed to create pool");
        let db = PostgresDatabase::from_pool(pool);
        db.connect_check().await.expect("connect_check should succeed");
        assert!(db.test_connection().await);
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_connect_check() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/quotekit_test".to_string());
        let pool = MySqlPoolOptions::new()
            .connect_lazy(&url)
            .expect("Failed to create pool");
        let db = MysqlDatabase::from_pool(pool);
        db.connect_check().await.expect("connect_check should succeed");
        assert!(db.test_connection().await);
    }
}
