//! Quotekit - Internal sales quoting engine
//!
//! This library computes deterministic dollar estimates from a catalog of
//! project types, priced features, and priced pages, and persists each
//! estimate as an immutable quote against PostgreSQL or MySQL.

pub mod config;
pub mod db;
pub mod models;
pub mod pricing;
pub mod services;
