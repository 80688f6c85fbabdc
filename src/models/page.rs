//! Page model
//!
//! A page is a per-unit priced catalog entry (e.g. "landing page"),
//! optionally scoped to one project type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub price_per_page: f64,
    /// Scoping project type; `None` means the page is offered for all types.
    pub project_type_id: Option<i64>,
    pub default_quantity: i64,
    pub is_active: bool,
    pub supports_quantity: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
