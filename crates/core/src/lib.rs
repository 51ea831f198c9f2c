//! Foundation building blocks shared by every SiteGuard crate.
//!
//! This crate contains **pure** primitives (no IO, no async): identifiers and the
//! validation error model.

pub mod error;
pub mod id;

pub use error::{ValidationError, ValidationResult};
pub use id::{Address, MessageId, PersonId};
