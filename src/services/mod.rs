//! Services layer - Business logic
//!
//! Services coordinate the pure pricing engine with the repositories. They
//! are constructed explicitly by the composition root (or by tests, with
//! fake repositories); there is no process-wide state.

pub mod quote;

pub use quote::{QuoteDetail, QuoteRequest, QuoteService, QuoteServiceError};
