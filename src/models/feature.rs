//! Feature model
//!
//! A feature is a priced catalog line that can be added to an estimate.
//! Pricing is a tagged union: a feature is either fixed-price or hourly,
//! and each variant carries exactly the numeric fields it needs. The
//! "missing field for this pricing type" error class therefore only exists
//! at the storage boundary, inside [`FeaturePricing::from_columns`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::PricingError;

/// How a feature is priced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pricing_type", rename_all = "lowercase")]
pub enum FeaturePricing {
    /// One flat amount per unit
    Fixed { flat_price: f64 },
    /// Rate times estimated hours per unit
    Hourly {
        hourly_rate: f64,
        estimated_hours: f64,
    },
}

impl FeaturePricing {
    /// Reassemble the tagged pricing from nullable storage columns.
    ///
    /// This is the only place an incomplete catalog row can surface: a row
    /// whose declared pricing type is missing its required numeric fields is
    /// rejected rather than priced at $0.
    pub fn from_columns(
        feature_id: i64,
        pricing_type: &str,
        flat_price: Option<f64>,
        hourly_rate: Option<f64>,
        estimated_hours: Option<f64>,
    ) -> Result<Self, PricingError> {
        match pricing_type {
            "fixed" => match flat_price {
                Some(flat_price) => Ok(Self::Fixed { flat_price }),
                None => Err(PricingError::IncompletePricingDefinition {
                    feature_id,
                    reason: "pricing type 'fixed' requires flat_price".to_string(),
                }),
            },
            "hourly" => match (hourly_rate, estimated_hours) {
                (Some(hourly_rate), Some(estimated_hours)) => Ok(Self::Hourly {
                    hourly_rate,
                    estimated_hours,
                }),
                _ => Err(PricingError::IncompletePricingDefinition {
                    feature_id,
                    reason: "pricing type 'hourly' requires hourly_rate and estimated_hours"
                        .to_string(),
                }),
            },
            other => Err(PricingError::IncompletePricingDefinition {
                feature_id,
                reason: format!("unknown pricing type '{}'", other),
            }),
        }
    }

    /// Storage discriminator for the `pricing_type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Hourly { .. } => "hourly",
        }
    }

    /// Price of a single unit of this feature.
    pub fn unit_price(&self) -> f64 {
        match self {
            Self::Fixed { flat_price } => *flat_price,
            Self::Hourly {
                hourly_rate,
                estimated_hours,
            } => hourly_rate * estimated_hours,
        }
    }

    /// Nullable column values in `(flat_price, hourly_rate, estimated_hours)`
    /// order, for binding back into storage.
    pub fn columns(&self) -> (Option<f64>, Option<f64>, Option<f64>) {
        match self {
            Self::Fixed { flat_price } => (Some(*flat_price), None, None),
            Self::Hourly {
                hourly_rate,
                estimated_hours,
            } => (None, Some(*hourly_rate), Some(*estimated_hours)),
        }
    }
}

/// Catalog feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    #[serde(flatten)]
    pub pricing: FeaturePricing,
    pub supports_quantity: bool,
    /// When true the feature applies to every project type; otherwise the
    /// association table scopes it.
    pub for_all_project_types: bool,
    /// Project types this feature is associated with (empty when
    /// `for_all_project_types` is set).
    pub project_type_ids: Vec<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_from_columns() {
        let pricing = FeaturePricing::from_columns(1, "fixed", Some(500.0), None, None).unwrap();
        assert_eq!(pricing, FeaturePricing::Fixed { flat_price: 500.0 });
        assert_eq!(pricing.unit_price(), 500.0);
        assert_eq!(pricing.kind(), "fixed");
    }

    #[test]
    fn test_hourly_from_columns() {
        let pricing =
            FeaturePricing::from_columns(2, "hourly", None, Some(150.0), Some(10.0)).unwrap();
        assert_eq!(
            pricing,
            FeaturePricing::Hourly {
                hourly_rate: 150.0,
                estimated_hours: 10.0
            }
        );
        assert_eq!(pricing.unit_price(), 1500.0);
        assert_eq!(pricing.kind(), "hourly");
    }

    #[test]
    fn test_fixed_missing_flat_price_is_rejected() {
        let err = FeaturePricing::from_columns(3, "fixed", None, Some(150.0), Some(10.0))
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::IncompletePricingDefinition { feature_id: 3, .. }
        ));
    }

    #[test]
    fn test_hourly_missing_hours_is_rejected() {
        let err = FeaturePricing::from_columns(4, "hourly", None, Some(150.0), None).unwrap_err();
        assert!(matches!(
            err,
            PricingError::IncompletePricingDefinition { feature_id: 4, .. }
        ));
    }

    #[test]
    fn test_unknown_pricing_type_is_rejected() {
        let err =
            FeaturePricing::from_columns(5, "subscription", Some(9.0), None, None).unwrap_err();
        assert!(matches!(
            err,
            PricingError::IncompletePricingDefinition { feature_id: 5, .. }
        ));
    }

    #[test]
    fn test_columns_round_trip() {
        let fixed = FeaturePricing::Fixed { flat_price: 250.0 };
        assert_eq!(fixed.columns(), (Some(250.0), None, None));

        let hourly = FeaturePricing::Hourly {
            hourly_rate: 100.0,
            estimated_hours: 8.0,
        };
        assert_eq!(hourly.columns(), (None, Some(100.0), Some(8.0)));
    }

    #[test]
    fn test_serde_tagged_representation() {
        let json = serde_json::to_value(FeaturePricing::Fixed { flat_price: 500.0 }).unwrap();
        assert_eq!(json["pricing_type"], "fixed");
        assert_eq!(json["flat_price"], 500.0);

        let parsed: FeaturePricing = serde_json::from_value(serde_json::json!({
            "pricing_type": "hourly",
            "hourly_rate": 150.0,
            "estimated_hours": 10.0,
        }))
        .unwrap();
        assert_eq!(
            parsed,
            FeaturePricing::Hourly {
                hourly_rate: 150.0,
                estimated_hours: 10.0
            }
        );
    }
}
