//! Database repositories
//!
//! Repository pattern implementations for database access. Statements are
//! authored once in canonical `$n` syntax; the MySQL dispatch path translates
//! placeholders before execution.

pub mod catalog;
pub mod quote;

pub use catalog::{CatalogError, CatalogRepository, SqlxCatalogRepository};
pub use quote::{QuoteRepository, QuoteRepositoryError, SqlxQuoteRepository};
