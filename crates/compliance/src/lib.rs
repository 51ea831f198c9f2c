//! Compliance enrichment (pure domain logic).
//!
//! This crate turns raw violation batches into enriched ones and renders alerts.
//! It performs no IO: the rule table arrives already parsed, and alerts leave as
//! plain strings for an infra sink to deliver.

pub mod alert;
pub mod catalog;
pub mod enrich;

pub use alert::{AlertFormatter, format_alert};
pub use catalog::{Lookup, Rule, RuleCatalog, UNKNOWN_CONSEQUENCE, UNKNOWN_RULE};
pub use enrich::{Enrichment, Enricher};
