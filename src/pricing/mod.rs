//! Pricing engine
//!
//! Pure estimate computation: no I/O, no side effects, deterministic. The
//! engine turns a project type's base price plus the caller's feature/page
//! selections into a total and per-line breakdown. Callers format currency
//! for display; the engine works in raw IEEE-754 doubles and applies no
//! rounding of its own.
//!
//! Line items come back in the order they were selected. The total is a
//! plain sum, so reordering selections never changes it; the ordering only
//! matters for display reproducibility.

use serde::{Deserialize, Serialize};

use crate::models::{SelectedFeature, SelectedPage};

/// Error types for estimate computation
///
/// All variants are caller-correctable input problems. The engine never
/// partially computes: the first bad selection aborts the whole estimate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    /// Selection quantity below 1
    #[error("Invalid quantity {quantity} for {kind} {id}: must be at least 1")]
    InvalidQuantity {
        kind: &'static str,
        id: i64,
        quantity: i64,
    },

    /// Catalog row missing the numeric fields its pricing type requires
    #[error("Feature {feature_id} has an incomplete pricing definition: {reason}")]
    IncompletePricingDefinition { feature_id: i64, reason: String },

    /// Base price below zero
    #[error("Base price must be non-negative, got {0}")]
    NegativeBasePrice(f64),
}

/// One priced feature selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLine {
    pub feature_id: i64,
    pub quantity: i64,
    /// Snapshot line amount; this exact value is what gets persisted.
    pub price: f64,
}

/// One priced page selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLine {
    pub page_id: i64,
    pub quantity: i64,
    /// Snapshot line amount; this exact value is what gets persisted.
    pub price: f64,
}

/// Computed estimate: total plus per-line breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub total_price: f64,
    pub feature_lines: Vec<FeatureLine>,
    pub page_lines: Vec<PageLine>,
}

/// Compute an estimate from a base price and the caller's selections.
///
/// - Fixed features price at `flat_price * quantity`.
/// - Hourly features price at `hourly_rate * estimated_hours * quantity`.
/// - Pages price at `price_per_page * quantity`.
/// - The total is the base price plus the sum of all line amounts.
pub fn calculate(
    base_price: f64,
    selected_features: &[SelectedFeature],
    selected_pages: &[SelectedPage],
) -> Result<PriceBreakdown, PricingError> {
    if base_price < 0.0 {
        return Err(PricingError::NegativeBasePrice(base_price));
    }

    let mut feature_lines = Vec::with_capacity(selected_features.len());
    for selection in selected_features {
        if selection.quantity < 1 {
            return Err(PricingError::InvalidQuantity {
                kind: "feature",
                id: selection.feature.id,
                quantity: selection.quantity,
            });
        }
        let price = selection.feature.pricing.unit_price() * selection.quantity as f64;
        feature_lines.push(FeatureLine {
            feature_id: selection.feature.id,
            quantity: selection.quantity,
            price,
        });
    }

    let mut page_lines = Vec::with_capacity(selected_pages.len());
    for selection in selected_pages {
        if selection.quantity < 1 {
            return Err(PricingError::InvalidQuantity {
                kind: "page",
                id: selection.page.id,
                quantity: selection.quantity,
            });
        }
        let price = selection.page.price_per_page * selection.quantity as f64;
        page_lines.push(PageLine {
            page_id: selection.page.id,
            quantity: selection.quantity,
            price,
        });
    }

    let total_price = base_price
        + feature_lines.iter().map(|l| l.price).sum::<f64>()
        + page_lines.iter().map(|l| l.price).sum::<f64>();

    Ok(PriceBreakdown {
        total_price,
        feature_lines,
        page_lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Feature, FeaturePricing, Page};
    use chrono::Utc;

    fn fixed_feature(id: i64, flat_price: f64) -> Feature {
        feature(id, FeaturePricing::Fixed { flat_price })
    }

    fn hourly_feature(id: i64, hourly_rate: f64, estimated_hours: f64) -> Feature {
        feature(
            id,
            FeaturePricing::Hourly {
                hourly_rate,
                estimated_hours,
            },
        )
    }

    fn feature(id: i64, pricing: FeaturePricing) -> Feature {
        let now = Utc::now();
        Feature {
            id,
            name: format!("feature-{}", id),
            category: None,
            pricing,
            supports_quantity: true,
            for_all_project_types: true,
            project_type_ids: vec![],
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn page(id: i64, price_per_page: f64) -> Page {
        let now = Utc::now();
        Page {
            id,
            name: format!("page-{}", id),
            price_per_page,
            project_type_id: None,
            default_quantity: 1,
            is_active: true,
            supports_quantity: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn select(feature: Feature, quantity: i64) -> SelectedFeature {
        SelectedFeature { feature, quantity }
    }

    fn select_page(page: Page, quantity: i64) -> SelectedPage {
        SelectedPage { page, quantity }
    }

    #[test]
    fn test_empty_selections_total_is_base_price() {
        let breakdown = calculate(2500.0, &[], &[]).unwrap();
        assert_eq!(breakdown.total_price, 2500.0);
        assert!(breakdown.feature_lines.is_empty());
        assert!(breakdown.page_lines.is_empty());
    }

    #[test]
    fn test_fixed_feature_price_is_flat_times_quantity() {
        let breakdown =
            calculate(0.0, &[select(fixed_feature(1, 500.0), 2)], &[]).unwrap();
        assert_eq!(breakdown.feature_lines[0].price, 1000.0);
        assert_eq!(breakdown.total_price, 1000.0);
    }

    #[test]
    fn test_hourly_feature_price_is_rate_times_hours_times_quantity() {
        let breakdown =
            calculate(0.0, &[select(hourly_feature(1, 150.0, 10.0), 1)], &[]).unwrap();
        assert_eq!(breakdown.feature_lines[0].price, 1500.0);
        assert_eq!(breakdown.total_price, 1500.0);
    }

    #[test]
    fn test_page_price_is_per_page_times_quantity() {
        let breakdown = calculate(0.0, &[], &[select_page(page(7, 50.0), 4)]).unwrap();
        assert_eq!(breakdown.page_lines[0].price, 200.0);
        assert_eq!(breakdown.total_price, 200.0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // base 2000 + fixed 500x1 + hourly 100*5 x2 + page 50x4 = 3700
        let breakdown = calculate(
            2000.0,
            &[
                select(fixed_feature(1, 500.0), 1),
                select(hourly_feature(2, 100.0, 5.0), 2),
            ],
            &[select_page(page(3, 50.0), 4)],
        )
        .unwrap();
        assert_eq!(breakdown.total_price, 3700.0);
        assert_eq!(breakdown.feature_lines[0].price, 500.0);
        assert_eq!(breakdown.feature_lines[1].price, 1000.0);
        assert_eq!(breakdown.page_lines[0].price, 200.0);
    }

    #[test]
    fn test_line_items_keep_selection_order() {
        let breakdown = calculate(
            0.0,
            &[
                select(fixed_feature(9, 10.0), 1),
                select(fixed_feature(3, 20.0), 1),
                select(fixed_feature(5, 30.0), 1),
            ],
            &[],
        )
        .unwrap();
        let ids: Vec<i64> = breakdown.feature_lines.iter().map(|l| l.feature_id).collect();
        assert_eq!(ids, vec![9, 3, 5]);
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let err = calculate(0.0, &[select(fixed_feature(1, 500.0), 0)], &[]).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidQuantity {
                kind: "feature",
                id: 1,
                quantity: 0
            }
        );
    }

    #[test]
    fn test_negative_page_quantity_is_rejected() {
        let err = calculate(0.0, &[], &[select_page(page(2, 50.0), -3)]).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidQuantity {
                kind: "page",
                id: 2,
                quantity: -3
            }
        );
    }

    #[test]
    fn test_negative_base_price_is_rejected() {
        let err = calculate(-1.0, &[], &[]).unwrap_err();
        assert_eq!(err, PricingError::NegativeBasePrice(-1.0));
    }

    #[test]
    fn test_bad_selection_aborts_whole_estimate() {
        // A valid first selection does not survive a bad second one.
        let result = calculate(
            100.0,
            &[
                select(fixed_feature(1, 500.0), 1),
                select(fixed_feature(2, 500.0), 0),
            ],
            &[],
        );
        assert!(result.is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_selection() -> impl Strategy<Value = SelectedFeature> {
            (
                1i64..10_000,
                prop_oneof![
                    (0.0f64..100_000.0).prop_map(|flat_price| FeaturePricing::Fixed { flat_price }),
                    (0.0f64..1_000.0, 0.0f64..500.0).prop_map(|(hourly_rate, estimated_hours)| {
                        FeaturePricing::Hourly {
                            hourly_rate,
                            estimated_hours,
                        }
                    }),
                ],
                1i64..100,
            )
                .prop_map(|(id, pricing, quantity)| select(feature(id, pricing), quantity))
        }

        fn arb_page_selection() -> impl Strategy<Value = SelectedPage> {
            (1i64..10_000, 0.0f64..10_000.0, 1i64..100)
                .prop_map(|(id, price, quantity)| select_page(page(id, price), quantity))
        }

        proptest! {
            #[test]
            fn total_is_base_plus_line_sums(
                base in 0.0f64..1_000_000.0,
                features in prop::collection::vec(arb_selection(), 0..8),
                pages in prop::collection::vec(arb_page_selection(), 0..8),
            ) {
                let breakdown = calculate(base, &features, &pages).unwrap();
                let expected = base
                    + breakdown.feature_lines.iter().map(|l| l.price).sum::<f64>()
                    + breakdown.page_lines.iter().map(|l| l.price).sum::<f64>();
                prop_assert_eq!(breakdown.total_price, expected);
            }

            #[test]
            fn total_is_order_independent(
                base in 0.0f64..1_000_000.0,
                features in prop::collection::vec(arb_selection(), 0..8),
                pages in prop::collection::vec(arb_page_selection(), 0..8),
            ) {
                let forward = calculate(base, &features, &pages).unwrap();

                let mut rev_features = features.clone();
                rev_features.reverse();
                let mut rev_pages = pages.clone();
                rev_pages.reverse();
                let reversed = calculate(base, &rev_features, &rev_pages).unwrap();

                // Summation order is unchanged (lines are still summed
                // first-to-last), so the totals match bit-for-bit only when
                // addition happens over the same multiset; compare with a
                // tolerance scaled to the magnitude involved.
                let scale = forward.total_price.abs().max(1.0);
                prop_assert!((forward.total_price - reversed.total_price).abs() <= scale * 1e-9);
            }

            #[test]
            fn line_count_matches_selection_count(
                features in prop::collection::vec(arb_selection(), 0..8),
                pages in prop::collection::vec(arb_page_selection(), 0..8),
            ) {
                let breakdown = calculate(0.0, &features, &pages).unwrap();
                prop_assert_eq!(breakdown.feature_lines.len(), features.len());
                prop_assert_eq!(breakdown.page_lines.len(), pages.len());
            }
        }
    }
}
