//! Domain models
//!
//! Catalog entities (project types, features, pages), quote records, and the
//! ephemeral selection inputs fed to the pricing engine.

pub mod feature;
pub mod page;
pub mod project_type;
pub mod quote;
pub mod selection;

pub use feature::{Feature, FeaturePricing};
pub use page::Page;
pub use project_type::ProjectType;
pub use quote::{
    LeadStatus, NewQuote, Quote, QuoteContactUpdate, QuoteFeature, QuotePage,
};
pub use selection::{SelectedFeature, SelectedPage};
