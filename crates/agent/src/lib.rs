//! SiteGuard agent: wires the enrichment pipeline from configuration.

pub mod app;

pub use app::{Pipeline, build_feed, build_sink, start};
