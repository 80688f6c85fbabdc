//! Quote repository
//!
//! Persists quote headers and their line items, and reconstructs them.
//! Creation is the one multi-statement write in the system and runs inside a
//! single transaction: the header insert and every line-item insert happen
//! on one connection, and any failure rolls the whole unit back, so a
//! partial quote is never visible to readers.
//!
//! Line-item prices are the engine's snapshot values. Nothing in this module
//! joins the catalog tables: a stored quote keeps its prices even when the
//! catalog changes later.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, PgPool, Row};
use std::sync::Arc;

use crate::db::{translate_placeholders, DbError, DynDatabasePool};
use crate::config::DatabaseDriver;
use crate::models::{LeadStatus, NewQuote, Quote, QuoteContactUpdate, QuoteFeature, QuotePage};
use crate::pricing::{FeatureLine, PageLine};

/// Error type for quote persistence
#[derive(Debug, thiserror::Error)]
pub enum QuoteRepositoryError {
    /// Transactional create failed and was rolled back; no quote exists
    #[error("Quote write failed, transaction rolled back: {source}")]
    WriteFailed {
        #[source]
        source: sqlx::Error,
    },

    /// Single-statement read/update/delete failure
    #[error(transparent)]
    Db(#[from] DbError),
}

fn write_failed(source: sqlx::Error) -> QuoteRepositoryError {
    QuoteRepositoryError::WriteFailed { source }
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Insert a quote header and all its line items atomically.
    ///
    /// `total_price` and the line prices are the engine's already-computed
    /// snapshots; they are stored verbatim, never recomputed.
    async fn create(
        &self,
        quote: &NewQuote,
        total_price: f64,
        feature_lines: &[FeatureLine],
        page_lines: &[PageLine],
    ) -> Result<Quote, QuoteRepositoryError>;

    /// Fetch one quote; `None` for a missing id, never an error.
    async fn get_by_id(&self, id: i64) -> Result<Option<Quote>, QuoteRepositoryError>;

    /// All quotes, newest first.
    async fn list(&self) -> Result<Vec<Quote>, QuoteRepositoryError>;

    /// Feature line items for a quote; empty for a missing id.
    async fn get_features(&self, quote_id: i64)
        -> Result<Vec<QuoteFeature>, QuoteRepositoryError>;

    /// Page line items for a quote; empty for a missing id.
    async fn get_pages(&self, quote_id: i64) -> Result<Vec<QuotePage>, QuoteRepositoryError>;

    /// Move a quote through the sales pipeline. Pricing stays untouched.
    async fn update_status(&self, id: i64, status: LeadStatus)
        -> Result<(), QuoteRepositoryError>;

    /// Partial update of the mutable contact fields. Pricing stays untouched.
    async fn update_contact(
        &self,
        id: i64,
        update: &QuoteContactUpdate,
    ) -> Result<(), QuoteRepositoryError>;

    /// Delete the quote header; line items cascade at the schema level.
    async fn delete(&self, id: i64) -> Result<(), QuoteRepositoryError>;
}

pub struct SqlxQuoteRepository {
    pool: DynDatabasePool,
}

impl SqlxQuoteRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn QuoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl QuoteRepository for SqlxQuoteRepository {
    async fn create(
        &self,
        quote: &NewQuote,
        total_price: f64,
        feature_lines: &[FeatureLine],
        page_lines: &[PageLine],
    ) -> Result<Quote, QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                create_postgres(
                    self.pool.as_postgres().unwrap(),
                    quote,
                    total_price,
                    feature_lines,
                    page_lines,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                create_mysql(
                    self.pool.as_mysql().unwrap(),
                    quote,
                    total_price,
                    feature_lines,
                    page_lines,
                )
                .await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Quote>, QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                get_by_id_postgres(self.pool.as_postgres().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Quote>, QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => list_postgres(self.pool.as_postgres().unwrap()).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn get_features(
        &self,
        quote_id: i64,
    ) -> Result<Vec<QuoteFeature>, QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                get_features_postgres(self.pool.as_postgres().unwrap(), quote_id).await
            }
            DatabaseDriver::Mysql => {
                get_features_mysql(self.pool.as_mysql().unwrap(), quote_id).await
            }
        }
    }

    async fn get_pages(&self, quote_id: i64) -> Result<Vec<QuotePage>, QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                get_pages_postgres(self.pool.as_postgres().unwrap(), quote_id).await
            }
            DatabaseDriver::Mysql => {
                get_pages_mysql(self.pool.as_mysql().unwrap(), quote_id).await
            }
        }
    }

    async fn update_status(
        &self,
        id: i64,
        status: LeadStatus,
    ) -> Result<(), QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                update_status_postgres(self.pool.as_postgres().unwrap(), id, status).await
            }
            DatabaseDriver::Mysql => {
                update_status_mysql(self.pool.as_mysql().unwrap(), id, status).await
            }
        }
    }

    async fn update_contact(
        &self,
        id: i64,
        update: &QuoteContactUpdate,
    ) -> Result<(), QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                update_contact_postgres(self.pool.as_postgres().unwrap(), id, update).await
            }
            DatabaseDriver::Mysql => {
                update_contact_mysql(self.pool.as_mysql().unwrap(), id, update).await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<(), QuoteRepositoryError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                delete_postgres(self.pool.as_postgres().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// Canonical statements, $n placeholder syntax.
const INSERT_QUOTE: &str = "INSERT INTO quotes (project_type_id, client_name, email, phone, company, notes, total_price, lead_status, created_by, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";
const INSERT_QUOTE_FEATURE: &str =
    "INSERT INTO quote_features (quote_id, feature_id, quantity, price) VALUES ($1, $2, $3, $4)";
const INSERT_QUOTE_PAGE: &str =
    "INSERT INTO quote_pages (quote_id, page_id, quantity, price) VALUES ($1, $2, $3, $4)";
const SELECT_QUOTE: &str = "SELECT id, project_type_id, client_name, email, phone, company, notes, total_price, lead_status, created_by, created_at, updated_at FROM quotes WHERE id = $1";
const LIST_QUOTES: &str = "SELECT id, project_type_id, client_name, email, phone, company, notes, total_price, lead_status, created_by, created_at, updated_at FROM quotes ORDER BY created_at DESC, id DESC";
const SELECT_QUOTE_FEATURES: &str = "SELECT id, quote_id, feature_id, quantity, price FROM quote_features WHERE quote_id = $1 ORDER BY id";
const SELECT_QUOTE_PAGES: &str =
    "SELECT id, quote_id, page_id, quantity, price FROM quote_pages WHERE quote_id = $1 ORDER BY id";
const UPDATE_STATUS: &str = "UPDATE quotes SET lead_status = $1, updated_at = $2 WHERE id = $3";
const DELETE_QUOTE: &str = "DELETE FROM quotes WHERE id = $1";

/// Build the dynamic SET clause for a contact update.
///
/// Returns the canonical statement and the string values to bind in `$n`
/// order, or `None` when every field is absent (a no-op update).
fn build_contact_update(update: &QuoteContactUpdate) -> Option<(String, Vec<String>)> {
    let mut sets = Vec::new();
    let mut values = Vec::new();

    let fields = [
        ("client_name", &update.client_name),
        ("email", &update.email),
        ("phone", &update.phone),
        ("company", &update.company),
        ("notes", &update.notes),
    ];
    for (column, value) in fields {
        if let Some(value) = value {
            sets.push(format!("{} = ${}", column, values.len() + 1));
            values.push(value.clone());
        }
    }

    if sets.is_empty() {
        return None;
    }

    let sql = format!(
        "UPDATE quotes SET {}, updated_at = ${} WHERE id = ${}",
        sets.join(", "),
        values.len() + 1,
        values.len() + 2
    );
    Some((sql, values))
}

fn quote_from_parts(id: i64, quote: &NewQuote, total_price: f64, now: chrono::DateTime<Utc>) -> Quote {
    Quote {
        id,
        project_type_id: quote.project_type_id,
        client_name: quote.client_name.clone(),
        email: quote.email.clone(),
        phone: quote.phone.clone(),
        company: quote.company.clone(),
        notes: quote.notes.clone(),
        total_price,
        lead_status: LeadStatus::InProgress,
        created_by: quote.created_by.clone(),
        created_at: now,
        updated_at: now,
    }
}

// PostgreSQL implementations

async fn create_postgres(
    pool: &PgPool,
    quote: &NewQuote,
    total_price: f64,
    feature_lines: &[FeatureLine],
    page_lines: &[PageLine],
) -> Result<Quote, QuoteRepositoryError> {
    let now = Utc::now();
    // Dropping the transaction without commit rolls it back.
    let mut tx = pool.begin().await.map_err(write_failed)?;

    let insert = format!("{} RETURNING id", INSERT_QUOTE);
    let row = sqlx::query(&insert)
        .bind(quote.project_type_id)
        .bind(&quote.client_name)
        .bind(&quote.email)
        .bind(&quote.phone)
        .bind(&quote.company)
        .bind(&quote.notes)
        .bind(total_price)
        .bind(LeadStatus::InProgress.to_string())
        .bind(&quote.created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_failed)?;
    let id: i64 = row.get("id");

    for line in feature_lines {
        sqlx::query(INSERT_QUOTE_FEATURE)
            .bind(id)
            .bind(line.feature_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
    }

    for line in page_lines {
        sqlx::query(INSERT_QUOTE_PAGE)
            .bind(id)
            .bind(line.page_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
    }

    tx.commit().await.map_err(write_failed)?;

    tracing::info!(quote_id = id, total_price, "Created quote");
    Ok(quote_from_parts(id, quote, total_price, now))
}

async fn get_by_id_postgres(pool: &PgPool, id: i64) -> Result<Option<Quote>, QuoteRepositoryError> {
    let row = sqlx::query(SELECT_QUOTE)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::query("fetching quote", e))?;
    Ok(row.map(|r| row_to_quote_postgres(&r)))
}

async fn list_postgres(pool: &PgPool) -> Result<Vec<Quote>, QuoteRepositoryError> {
    let rows = sqlx::query(LIST_QUOTES)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("listing quotes", e))?;
    Ok(rows.iter().map(row_to_quote_postgres).collect())
}

async fn get_features_postgres(
    pool: &PgPool,
    quote_id: i64,
) -> Result<Vec<QuoteFeature>, QuoteRepositoryError> {
    let rows = sqlx::query(SELECT_QUOTE_FEATURES)
        .bind(quote_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching quote features", e))?;
    Ok(rows
        .iter()
        .map(|r| QuoteFeature {
            id: r.get("id"),
            quote_id: r.get("quote_id"),
            feature_id: r.get("feature_id"),
            quantity: r.get("quantity"),
            price: r.get("price"),
        })
        .collect())
}

async fn get_pages_postgres(
    pool: &PgPool,
    quote_id: i64,
) -> Result<Vec<QuotePage>, QuoteRepositoryError> {
    let rows = sqlx::query(SELECT_QUOTE_PAGES)
        .bind(quote_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching quote pages", e))?;
    Ok(rows
        .iter()
        .map(|r| QuotePage {
            id: r.get("id"),
            quote_id: r.get("quote_id"),
            page_id: r.get("page_id"),
            quantity: r.get("quantity"),
            price: r.get("price"),
        })
        .collect())
}

async fn update_status_postgres(
    pool: &PgPool,
    id: i64,
    status: LeadStatus,
) -> Result<(), QuoteRepositoryError> {
    sqlx::query(UPDATE_STATUS)
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("updating quote status", e))?;
    Ok(())
}

async fn update_contact_postgres(
    pool: &PgPool,
    id: i64,
    update: &QuoteContactUpdate,
) -> Result<(), QuoteRepositoryError> {
    let Some((sql, values)) = build_contact_update(update) else {
        return Ok(());
    };
    let mut query = sqlx::query(&sql);
    for value in &values {
        query = query.bind(value);
    }
    query
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("updating quote contact fields", e))?;
    Ok(())
}

async fn delete_postgres(pool: &PgPool, id: i64) -> Result<(), QuoteRepositoryError> {
    sqlx::query(DELETE_QUOTE)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("deleting quote", e))?;
    Ok(())
}

fn row_to_quote_postgres(row: &sqlx::postgres::PgRow) -> Quote {
    let status: String = row.get("lead_status");
    Quote {
        id: row.get("id"),
        project_type_id: row.get("project_type_id"),
        client_name: row.get("client_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        company: row.get("company"),
        notes: row.get("notes"),
        total_price: row.get("total_price"),
        lead_status: status.parse().unwrap_or_default(),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// MySQL implementations

async fn create_mysql(
    pool: &MySqlPool,
    quote: &NewQuote,
    total_price: f64,
    feature_lines: &[FeatureLine],
    page_lines: &[PageLine],
) -> Result<Quote, QuoteRepositoryError> {
    let now = Utc::now();
    let mut tx = pool.begin().await.map_err(write_failed)?;

    let result = sqlx::query(&translate_placeholders(INSERT_QUOTE))
        .bind(quote.project_type_id)
        .bind(&quote.client_name)
        .bind(&quote.email)
        .bind(&quote.phone)
        .bind(&quote.company)
        .bind(&quote.notes)
        .bind(total_price)
        .bind(LeadStatus::InProgress.to_string())
        .bind(&quote.created_by)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(write_failed)?;
    let id = result.last_insert_id() as i64;

    for line in feature_lines {
        sqlx::query(&translate_placeholders(INSERT_QUOTE_FEATURE))
            .bind(id)
            .bind(line.feature_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
    }

    for line in page_lines {
        sqlx::query(&translate_placeholders(INSERT_QUOTE_PAGE))
            .bind(id)
            .bind(line.page_id)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await
            .map_err(write_failed)?;
    }

    tx.commit().await.map_err(write_failed)?;

    tracing::info!(quote_id = id, total_price, "Created quote");
    Ok(quote_from_parts(id, quote, total_price, now))
}

async fn get_by_id_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<Quote>, QuoteRepositoryError> {
    let row = sqlx::query(&translate_placeholders(SELECT_QUOTE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::query("fetching quote", e))?;
    Ok(row.map(|r| row_to_quote_mysql(&r)))
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Quote>, QuoteRepositoryError> {
    let rows = sqlx::query(LIST_QUOTES)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("listing quotes", e))?;
    Ok(rows.iter().map(row_to_quote_mysql).collect())
}

async fn get_features_mysql(
    pool: &MySqlPool,
    quote_id: i64,
) -> Result<Vec<QuoteFeature>, QuoteRepositoryError> {
    let rows = sqlx::query(&translate_placeholders(SELECT_QUOTE_FEATURES))
        .bind(quote_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching quote features", e))?;
    Ok(rows
        .iter()
        .map(|r| QuoteFeature {
            id: r.get("id"),
            quote_id: r.get("quote_id"),
            feature_id: r.get("feature_id"),
            quantity: r.get("quantity"),
            price: r.get("price"),
        })
        .collect())
}

async fn get_pages_mysql(
    pool: &MySqlPool,
    quote_id: i64,
) -> Result<Vec<QuotePage>, QuoteRepositoryError> {
    let rows = sqlx::query(&translate_placeholders(SELECT_QUOTE_PAGES))
        .bind(quote_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching quote pages", e))?;
    Ok(rows
        .iter()
        .map(|r| QuotePage {
            id: r.get("id"),
            quote_id: r.get("quote_id"),
            page_id: r.get("page_id"),
            quantity: r.get("quantity"),
            price: r.get("price"),
        })
        .collect())
}

async fn update_status_mysql(
    pool: &MySqlPool,
    id: i64,
    status: LeadStatus,
) -> Result<(), QuoteRepositoryError> {
    sqlx::query(&translate_placeholders(UPDATE_STATUS))
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("updating quote status", e))?;
    Ok(())
}

async fn update_contact_mysql(
    pool: &MySqlPool,
    id: i64,
    update: &QuoteContactUpdate,
) -> Result<(), QuoteRepositoryError> {
    let Some((sql, values)) = build_contact_update(update) else {
        return Ok(());
    };
    let sql = translate_placeholders(&sql);
    let mut query = sqlx::query(&sql);
    for value in &values {
        query = query.bind(value);
    }
    query
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("updating quote contact fields", e))?;
    Ok(())
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<(), QuoteRepositoryError> {
    sqlx::query(&translate_placeholders(DELETE_QUOTE))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| DbError::query("deleting quote", e))?;
    Ok(())
}

fn row_to_quote_mysql(row: &sqlx::mysql::MySqlRow) -> Quote {
    let status: String = row.get("lead_status");
    Quote {
        id: row.get("id"),
        project_type_id: row.get("project_type_id"),
        client_name: row.get("client_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        company: row.get("company"),
        notes: row.get("notes"),
        total_price: row.get("total_price"),
        lead_status: status.parse().unwrap_or_default(),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
