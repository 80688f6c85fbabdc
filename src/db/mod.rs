//! Database layer
//!
//! This module provides database abstraction for the Quotekit quoting engine.
//! It supports:
//! - PostgreSQL
//! - MySQL
//!
//! The backend is selected from configuration. Repositories author every
//! statement once, in canonical `$n` placeholder syntax; the MySQL dispatch
//! path rewrites placeholders to `?` before execution (see [`placeholder`]),
//! so callers never deal with dialect differences.

pub mod migrations;
pub mod placeholder;
pub mod pool;
pub mod repositories;

pub use placeholder::translate_placeholders;
pub use pool::{create_pool, DatabasePool, DynDatabasePool, MysqlDatabase, PostgresDatabase};

/// Error type for backend-level database failures
///
/// The underlying driver error is always attached as the source; it is
/// surfaced to the caller, never masked.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Could not establish or verify a connection
    #[error("Database connection failed: {source}")]
    Connection {
        #[source]
        source: sqlx::Error,
    },

    /// A statement failed to execute
    #[error("Query failed ({context}): {source}")]
    Query {
        context: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DbError {
    pub fn connection(source: sqlx::Error) -> Self {
        Self::Connection { source }
    }

    pub fn query(context: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }
}
