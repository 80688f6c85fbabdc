//! Database migrations module
//!
//! Code-based migrations for the Quotekit schema. All migrations are embedded
//! as SQL strings, with one dialect per supported backend, so a fresh
//! database is brought up by the binary itself.
//!
//! # Architecture
//!
//! Each migration is a `Migration` struct containing:
//! - `version`: Unique version number for ordering
//! - `name`: Human-readable migration name
//! - `up_postgres`: SQL for PostgreSQL
//! - `up_mysql`: SQL for MySQL
//!
//! The `quote_features` and `quote_pages` tables carry `ON DELETE CASCADE`
//! foreign keys to `quotes`: deleting a quote removes its line items at the
//! schema level, so no orphan line item can exist. Their references to the
//! catalog tables are plain (restricting) foreign keys, protecting catalog
//! rows that historical quotes point at.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, PgPool, Row};

use super::{translate_placeholders, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both PostgreSQL and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for PostgreSQL
    pub up_postgres: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations for the Quotekit schema.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: Catalog anchor table
    Migration {
        version: 1,
        name: "create_project_types",
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS project_types (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                base_price DOUBLE PRECISION NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS project_types (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                description TEXT,
                base_price DOUBLE NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    // Migration 2: Features and their project-type associations.
    // The nullable pricing columns are reassembled into the tagged
    // FeaturePricing union at read time; a row missing the fields its
    // pricing_type requires is rejected there.
    Migration {
        version: 2,
        name: "create_features",
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS features (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                category VARCHAR(100),
                pricing_type VARCHAR(20) NOT NULL,
                flat_price DOUBLE PRECISION,
                hourly_rate DOUBLE PRECISION,
                estimated_hours DOUBLE PRECISION,
                supports_quantity BOOLEAN NOT NULL DEFAULT FALSE,
                for_all_project_types BOOLEAN NOT NULL DEFAULT FALSE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE IF NOT EXISTS feature_project_types (
                feature_id BIGINT NOT NULL REFERENCES features(id) ON DELETE CASCADE,
                project_type_id BIGINT NOT NULL REFERENCES project_types(id) ON DELETE CASCADE,
                PRIMARY KEY (feature_id, project_type_id)
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS features (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                category VARCHAR(100),
                pricing_type VARCHAR(20) NOT NULL,
                flat_price DOUBLE,
                hourly_rate DOUBLE,
                estimated_hours DOUBLE,
                supports_quantity BOOLEAN NOT NULL DEFAULT FALSE,
                for_all_project_types BOOLEAN NOT NULL DEFAULT FALSE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS feature_project_types (
                feature_id BIGINT NOT NULL,
                project_type_id BIGINT NOT NULL,
                PRIMARY KEY (feature_id, project_type_id),
                FOREIGN KEY (feature_id) REFERENCES features(id) ON DELETE CASCADE,
                FOREIGN KEY (project_type_id) REFERENCES project_types(id) ON DELETE CASCADE
            );
        "#,
    },
    // Migration 3: Pages
    Migration {
        version: 3,
        name: "create_pages",
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                price_per_page DOUBLE PRECISION NOT NULL DEFAULT 0,
                project_type_id BIGINT REFERENCES project_types(id) ON DELETE SET NULL,
                default_quantity BIGINT NOT NULL DEFAULT 1,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                supports_quantity BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(255) NOT NULL,
                price_per_page DOUBLE NOT NULL DEFAULT 0,
                project_type_id BIGINT,
                default_quantity BIGINT NOT NULL DEFAULT 1,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                supports_quantity BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (project_type_id) REFERENCES project_types(id) ON DELETE SET NULL
            );
        "#,
    },
    // Migration 4: Quote headers
    Migration {
        version: 4,
        name: "create_quotes",
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id BIGSERIAL PRIMARY KEY,
                project_type_id BIGINT NOT NULL REFERENCES project_types(id),
                client_name VARCHAR(255) NOT NULL,
                email VARCHAR(255),
                phone VARCHAR(50),
                company VARCHAR(255),
                notes TEXT,
                total_price DOUBLE PRECISION NOT NULL,
                lead_status VARCHAR(20) NOT NULL DEFAULT 'In Progress',
                created_by VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_quotes_lead_status ON quotes(lead_status);
            CREATE INDEX IF NOT EXISTS idx_quotes_created_at ON quotes(created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                project_type_id BIGINT NOT NULL,
                client_name VARCHAR(255) NOT NULL,
                email VARCHAR(255),
                phone VARCHAR(50),
                company VARCHAR(255),
                notes TEXT,
                total_price DOUBLE NOT NULL,
                lead_status VARCHAR(20) NOT NULL DEFAULT 'In Progress',
                created_by VARCHAR(255),
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (project_type_id) REFERENCES project_types(id)
            );
            CREATE INDEX idx_quotes_lead_status ON quotes(lead_status);
            CREATE INDEX idx_quotes_created_at ON quotes(created_at);
        "#,
    },
    // Migration 5: Quote line items. Prices here are creation-time
    // snapshots; nothing rereads the catalog for them.
    Migration {
        version: 5,
        name: "create_quote_line_items",
        up_postgres: r#"
            CREATE TABLE IF NOT EXISTS quote_features (
                id BIGSERIAL PRIMARY KEY,
                quote_id BIGINT NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
                feature_id BIGINT NOT NULL REFERENCES features(id),
                quantity BIGINT NOT NULL DEFAULT 1,
                price DOUBLE PRECISION NOT NULL
            );
            CREATE TABLE IF NOT EXISTS quote_pages (
                id BIGSERIAL PRIMARY KEY,
                quote_id BIGINT NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
                page_id BIGINT NOT NULL REFERENCES pages(id),
                quantity BIGINT NOT NULL DEFAULT 1,
                price DOUBLE PRECISION NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_quote_features_quote ON quote_features(quote_id);
            CREATE INDEX IF NOT EXISTS idx_quote_pages_quote ON quote_pages(quote_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS quote_features (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                quote_id BIGINT NOT NULL,
                feature_id BIGINT NOT NULL,
                quantity BIGINT NOT NULL DEFAULT 1,
                price DOUBLE NOT NULL,
                FOREIGN KEY (quote_id) REFERENCES quotes(id) ON DELETE CASCADE,
                FOREIGN KEY (feature_id) REFERENCES features(id)
            );
            CREATE TABLE IF NOT EXISTS quote_pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                quote_id BIGINT NOT NULL,
                page_id BIGINT NOT NULL,
                quantity BIGINT NOT NULL DEFAULT 1,
                price DOUBLE NOT NULL,
                FOREIGN KEY (quote_id) REFERENCES quotes(id) ON DELETE CASCADE,
                FOREIGN KEY (page_id) REFERENCES pages(id)
            );
            CREATE INDEX idx_quote_features_quote ON quote_features(quote_id);
            CREATE INDEX idx_quote_pages_quote ON quote_pages(quote_id);
        "#,
    },
];

/// Run all pending migrations
///
/// Creates the tracking table if needed, checks which migrations have been
/// applied, and applies the rest in version order.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Postgres => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Postgres => {
            get_applied_migrations_postgres(pool.as_postgres().unwrap()).await
        }
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.as_mysql().unwrap()).await,
    }
}

const SELECT_MIGRATIONS: &str =
    "SELECT version, name, applied_at FROM _migrations ORDER BY version";

async fn get_applied_migrations_postgres(pool: &PgPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query(SELECT_MIGRATIONS).fetch_all(pool).await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query(SELECT_MIGRATIONS).fetch_all(pool).await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get::<i32, _>("version") as i64,
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

const INSERT_MIGRATION: &str = "INSERT INTO _migrations (version, name) VALUES ($1, $2)";

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Postgres => {
            apply_migration_postgres(pool.as_postgres().unwrap(), migration).await
        }
        DatabaseDriver::Mysql => {
            apply_migration_mysql(pool.as_mysql().unwrap(), migration).await
        }
    }
}

async fn apply_migration_postgres(pool: &PgPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_postgres) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query(INSERT_MIGRATION)
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query(&translate_placeholders(INSERT_MIGRATION))
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    if sql.len() > 100 {
        format!("{}...", &sql[..100])
    } else {
        sql.to_string()
    }
}

/// Split SQL into individual statements, handling comments properly
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_statement = false;

    for (i, c) in sql.char_indices() {
        match c {
            ';' => {
                if in_statement {
                    let stmt = sql[current_start..i].trim();
                    if !stmt.is_empty() && !is_comment_only(stmt) {
                        statements.push(stmt);
                    }
                    in_statement = false;
                }
                current_start = i + 1;
            }
            _ if !c.is_whitespace() && !in_statement => {
                current_start = i;
                in_statement = true;
            }
            _ => {}
        }
    }

    if in_statement {
        let stmt = sql[current_start..].trim();
        if !stmt.is_empty() && !is_comment_only(stmt) {
            statements.push(stmt);
        }
    }

    statements
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    for line in s.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("--") {
            return false;
        }
    }
    true
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    let _ = create_migrations_table(pool).await;

    let applied = get_applied_migrations(pool).await?;
    Ok(applied.len() == MIGRATIONS.len())
}

/// Number of migrations known to this binary
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_unique_and_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, i as i32 + 1);
        }
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = r#"
            CREATE TABLE a (id INT);
            -- a comment
            CREATE TABLE b (id INT);
        "#;
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        // The comment rides along with the statement it precedes.
        assert!(statements[1].contains("CREATE TABLE b"));
    }

    #[test]
    fn test_split_handles_missing_trailing_semicolon() {
        let statements = split_sql_statements("CREATE TABLE a (id INT)");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_line_item_tables_cascade_from_quotes_only() {
        let lines = MIGRATIONS
            .iter()
            .find(|m| m.name == "create_quote_line_items")
            .unwrap();
        for dialect in [lines.up_postgres, lines.up_mysql] {
            // Exactly the two quote_id FKs cascade; catalog FKs restrict.
            assert_eq!(dialect.matches("ON DELETE CASCADE").count(), 2);
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_run_migrations_postgres() {
        let url = std::env::var("POSTGRES_TEST_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/quotekit_test".to_string());
        let pg = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&url)
            .expect("Failed to create pool");
        let pool: DynDatabasePool =
            std::sync::Arc::new(crate::db::PostgresDatabase::from_pool(pg));

        let applied = run_migrations(&pool).await.expect("migrations failed");
        assert_eq!(applied, MIGRATIONS.len());
        assert!(is_up_to_date(&pool).await.unwrap());

        // Second run is a no-op.
        let applied = run_migrations(&pool).await.expect("migrations failed");
        assert_eq!(applied, 0);
    }
}
