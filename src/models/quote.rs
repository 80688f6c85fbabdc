//! Quote models
//!
//! A quote is an immutable historical record of an estimate: its total and
//! line-item prices are snapshots captured at creation time and are never
//! recomputed from the live catalog. Only the lead status and contact
//! fields may change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sales pipeline status of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LeadStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Proposal Sent")]
    ProposalSent,
    Won,
    Lost,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "In Progress"),
            Self::ProposalSent => write!(f, "Proposal Sent"),
            Self::Won => write!(f, "Won"),
            Self::Lost => write!(f, "Lost"),
            Self::OnHold => write!(f, "On Hold"),
        }
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In Progress" => Ok(Self::InProgress),
            "Proposal Sent" => Ok(Self::ProposalSent),
            "Won" => Ok(Self::Won),
            "Lost" => Ok(Self::Lost),
            "On Hold" => Ok(Self::OnHold),
            _ => Err(anyhow::anyhow!("Invalid lead status: {}", s)),
        }
    }
}

/// Persisted quote header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub project_type_id: i64,
    pub client_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    /// Snapshot total from the pricing engine; immutable once written.
    pub total_price: f64,
    pub lead_status: LeadStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Header fields for a quote about to be created
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuote {
    pub project_type_id: i64,
    pub client_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// Persisted feature line item; `price` is the snapshot line amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteFeature {
    pub id: i64,
    pub quote_id: i64,
    pub feature_id: i64,
    pub quantity: i64,
    pub price: f64,
}

/// Persisted page line item; `price` is the snapshot line amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotePage {
    pub id: i64,
    pub quote_id: i64,
    pub page_id: i64,
    pub quantity: i64,
    pub price: f64,
}

/// Partial update of the mutable contact fields on a quote
///
/// Pricing fields are deliberately absent: a stored quote's total and line
/// items cannot be edited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteContactUpdate {
    pub client_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}
