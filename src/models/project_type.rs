//! Project type model
//!
//! A project type is the catalog anchor for a quote: its base price is the
//! starting point of every estimate built against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog project type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub base_price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
