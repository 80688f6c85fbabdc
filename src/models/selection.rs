//! Selection inputs
//!
//! Ephemeral pairings of a catalog entry with a caller-chosen quantity.
//! These exist only as pricing-engine input; they are never persisted as
//! such (the engine's computed line amounts are what gets stored).

use serde::{Deserialize, Serialize};

use crate::models::{Feature, Page};

/// A feature the caller picked, with quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFeature {
    pub feature: Feature,
    pub quantity: i64,
}

/// A page the caller picked, with quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedPage {
    pub page: Page,
    pub quantity: i64,
}
