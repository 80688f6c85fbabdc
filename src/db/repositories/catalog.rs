//! Catalog repository
//!
//! Read access to the pricing catalog: project types, features, and pages.
//! The catalog is the source of pricing *inputs*; it is never consulted when
//! reading back a stored quote.
//!
//! Feature rows store their pricing in nullable columns. Conversion to the
//! typed model goes through `FeaturePricing::from_columns`, so a row missing
//! the fields its declared pricing type requires surfaces an
//! `IncompletePricingDefinition` error here instead of producing a $0 line
//! downstream.

use async_trait::async_trait;
use sqlx::{MySqlPool, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::{translate_placeholders, DbError, DynDatabasePool};
use crate::models::{Feature, FeaturePricing, Page, ProjectType};
use crate::pricing::PricingError;

/// Error type for catalog reads
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// A stored feature row is unusable as pricing input
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active project types, for the calculator's first step.
    async fn list_project_types(&self) -> Result<Vec<ProjectType>, CatalogError>;

    /// One project type by id; `None` when missing.
    async fn get_project_type(&self, id: i64) -> Result<Option<ProjectType>, CatalogError>;

    /// Active features offered for a project type: rows associated with it
    /// plus rows flagged for all project types.
    async fn features_for_project_type(&self, project_type_id: i64)
        -> Result<Vec<Feature>, CatalogError>;

    /// Active pages offered for a project type: rows scoped to it plus
    /// unscoped rows.
    async fn pages_for_project_type(&self, project_type_id: i64)
        -> Result<Vec<Page>, CatalogError>;
}

pub struct SqlxCatalogRepository {
    pool: DynDatabasePool,
}

impl SqlxCatalogRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CatalogRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CatalogRepository for SqlxCatalogRepository {
    async fn list_project_types(&self) -> Result<Vec<ProjectType>, CatalogError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                list_project_types_postgres(self.pool.as_postgres().unwrap()).await
            }
            DatabaseDriver::Mysql => {
                list_project_types_mysql(self.pool.as_mysql().unwrap()).await
            }
        }
    }

    async fn get_project_type(&self, id: i64) -> Result<Option<ProjectType>, CatalogError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                get_project_type_postgres(self.pool.as_postgres().unwrap(), id).await
            }
            DatabaseDriver::Mysql => {
                get_project_type_mysql(self.pool.as_mysql().unwrap(), id).await
            }
        }
    }

    async fn features_for_project_type(
        &self,
        project_type_id: i64,
    ) -> Result<Vec<Feature>, CatalogError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                features_for_project_type_postgres(
                    self.pool.as_postgres().unwrap(),
                    project_type_id,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                features_for_project_type_mysql(self.pool.as_mysql().unwrap(), project_type_id)
                    .await
            }
        }
    }

    async fn pages_for_project_type(
        &self,
        project_type_id: i64,
    ) -> Result<Vec<Page>, CatalogError> {
        match self.pool.driver() {
            DatabaseDriver::Postgres => {
                pages_for_project_type_postgres(self.pool.as_postgres().unwrap(), project_type_id)
                    .await
            }
            DatabaseDriver::Mysql => {
                pages_for_project_type_mysql(self.pool.as_mysql().unwrap(), project_type_id).await
            }
        }
    }
}

// Canonical statements, $n placeholder syntax.
const LIST_PROJECT_TYPES: &str = "SELECT id, name, description, base_price, is_active, created_at, updated_at FROM project_types WHERE is_active = TRUE ORDER BY name";
const SELECT_PROJECT_TYPE: &str = "SELECT id, name, description, base_price, is_active, created_at, updated_at FROM project_types WHERE id = $1";
const SELECT_FEATURES_FOR_TYPE: &str = "SELECT DISTINCT f.id, f.name, f.category, f.pricing_type, f.flat_price, f.hourly_rate, f.estimated_hours, f.supports_quantity, f.for_all_project_types, f.is_active, f.created_at, f.updated_at FROM features f LEFT JOIN feature_project_types fpt ON fpt.feature_id = f.id WHERE f.is_active = TRUE AND (f.for_all_project_types = TRUE OR fpt.project_type_id = $1) ORDER BY f.id";
const SELECT_FEATURE_ASSOCIATIONS: &str =
    "SELECT feature_id, project_type_id FROM feature_project_types ORDER BY feature_id";
const SELECT_PAGES_FOR_TYPE: &str = "SELECT id, name, price_per_page, project_type_id, default_quantity, is_active, supports_quantity, created_at, updated_at FROM pages WHERE is_active = TRUE AND (project_type_id IS NULL OR project_type_id = $1) ORDER BY id";

// PostgreSQL implementations

async fn list_project_types_postgres(pool: &PgPool) -> Result<Vec<ProjectType>, CatalogError> {
    let rows = sqlx::query(LIST_PROJECT_TYPES)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("listing project types", e))?;
    Ok(rows.iter().map(row_to_project_type_postgres).collect())
}

async fn get_project_type_postgres(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ProjectType>, CatalogError> {
    let row = sqlx::query(SELECT_PROJECT_TYPE)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::query("fetching project type", e))?;
    Ok(row.map(|r| row_to_project_type_postgres(&r)))
}

async fn features_for_project_type_postgres(
    pool: &PgPool,
    project_type_id: i64,
) -> Result<Vec<Feature>, CatalogError> {
    let rows = sqlx::query(SELECT_FEATURES_FOR_TYPE)
        .bind(project_type_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching features for project type", e))?;

    let assoc_rows = sqlx::query(SELECT_FEATURE_ASSOCIATIONS)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching feature associations", e))?;
    let mut associations: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in &assoc_rows {
        associations
            .entry(row.get("feature_id"))
            .or_default()
            .push(row.get("project_type_id"));
    }

    let mut features = Vec::with_capacity(rows.len());
    for row in &rows {
        features.push(row_to_feature_postgres(row, &associations)?);
    }
    Ok(features)
}

async fn pages_for_project_type_postgres(
    pool: &PgPool,
    project_type_id: i64,
) -> Result<Vec<Page>, CatalogError> {
    let rows = sqlx::query(SELECT_PAGES_FOR_TYPE)
        .bind(project_type_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching pages for project type", e))?;
    Ok(rows.iter().map(row_to_page_postgres).collect())
}

fn row_to_project_type_postgres(row: &sqlx::postgres::PgRow) -> ProjectType {
    ProjectType {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        base_price: row.get("base_price"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_feature_postgres(
    row: &sqlx::postgres::PgRow,
    associations: &HashMap<i64, Vec<i64>>,
) -> Result<Feature, CatalogError> {
    let id: i64 = row.get("id");
    let pricing_type: String = row.get("pricing_type");
    let pricing = FeaturePricing::from_columns(
        id,
        &pricing_type,
        row.get("flat_price"),
        row.get("hourly_rate"),
        row.get("estimated_hours"),
    )?;
    Ok(Feature {
        id,
        name: row.get("name"),
        category: row.get("category"),
        pricing,
        supports_quantity: row.get("supports_quantity"),
        for_all_project_types: row.get("for_all_project_types"),
        project_type_ids: associations.get(&id).cloned().unwrap_or_default(),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_page_postgres(row: &sqlx::postgres::PgRow) -> Page {
    Page {
        id: row.get("id"),
        name: row.get("name"),
        price_per_page: row.get("price_per_page"),
        project_type_id: row.get("project_type_id"),
        default_quantity: row.get("default_quantity"),
        is_active: row.get("is_active"),
        supports_quantity: row.get("supports_quantity"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// MySQL implementations

async fn list_project_types_mysql(pool: &MySqlPool) -> Result<Vec<ProjectType>, CatalogError> {
    let rows = sqlx::query(LIST_PROJECT_TYPES)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("listing project types", e))?;
    Ok(rows.iter().map(row_to_project_type_mysql).collect())
}

async fn get_project_type_mysql(
    pool: &MySqlPool,
    id: i64,
) -> Result<Option<ProjectType>, CatalogError> {
    let row = sqlx::query(&translate_placeholders(SELECT_PROJECT_TYPE))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::query("fetching project type", e))?;
    Ok(row.map(|r| row_to_project_type_mysql(&r)))
}

async fn features_for_project_type_mysql(
    pool: &MySqlPool,
    project_type_id: i64,
) -> Result<Vec<Feature>, CatalogError> {
    let rows = sqlx::query(&translate_placeholders(SELECT_FEATURES_FOR_TYPE))
        .bind(project_type_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching features for project type", e))?;

    let assoc_rows = sqlx::query(SELECT_FEATURE_ASSOCIATIONS)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching feature associations", e))?;
    let mut associations: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in &assoc_rows {
        associations
            .entry(row.get("feature_id"))
            .or_default()
            .push(row.get("project_type_id"));
    }

    let mut features = Vec::with_capacity(rows.len());
    for row in &rows {
        features.push(row_to_feature_mysql(row, &associations)?);
    }
    Ok(features)
}

async fn pages_for_project_type_mysql(
    pool: &MySqlPool,
    project_type_id: i64,
) -> Result<Vec<Page>, CatalogError> {
    let rows = sqlx::query(&translate_placeholders(SELECT_PAGES_FOR_TYPE))
        .bind(project_type_id)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::query("fetching pages for project type", e))?;
    Ok(rows.iter().map(row_to_page_mysql).collect())
}

fn row_to_project_type_mysql(row: &sqlx::mysql::MySqlRow) -> ProjectType {
    ProjectType {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        base_price: row.get("base_price"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_feature_mysql(
    row: &sqlx::mysql::MySqlRow,
    associations: &HashMap<i64, Vec<i64>>,
) -> Result<Feature, CatalogError> {
    let id: i64 = row.get("id");
    let pricing_type: String = row.get("pricing_type");
    let pricing = FeaturePricing::from_columns(
        id,
        &pricing_type,
        row.get("flat_price"),
        row.get("hourly_rate"),
        row.get("estimated_hours"),
    )?;
    Ok(Feature {
        id,
        name: row.get("name"),
        category: row.get("category"),
        pricing,
        supports_quantity: row.get("supports_quantity"),
        for_all_project_types: row.get("for_all_project_types"),
        project_type_ids: associations.get(&id).cloned().unwrap_or_default(),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_page_mysql(row: &sqlx::mysql::MySqlRow) -> Page {
    Page {
        id: row.get("id"),
        name: row.get("name"),
        price_per_page: row.get("price_per_page"),
        project_type_id: row.get("project_type_id"),
        default_quantity: row.get("default_quantity"),
        is_active: row.get("is_active"),
        supports_quantity: row.get("supports_quantity"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
