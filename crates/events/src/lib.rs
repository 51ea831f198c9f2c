//! Message contract and transport mechanics.
//!
//! - `model`: violation / enriched payloads exchanged between actors
//! - `schema`: versioned schema tags and the `Contract` trait
//! - `envelope`: addressed, schema-tagged unit placed in a mailbox
//! - `decode`: lenient boundary decoder (legacy migration, per-entry skipping)
//! - `transport` / `in_memory`: mailbox delivery abstraction and its in-process implementation

pub mod decode;
pub mod envelope;
pub mod in_memory;
pub mod mailbox;
pub mod model;
pub mod schema;
pub mod transport;

pub use decode::{BatchHeader, Decoded, SkippedEntry, decode_header, decode_violations};
pub use envelope::{Envelope, OpenError};
pub use in_memory::InMemoryTransport;
pub use mailbox::Mailbox;
pub use model::{
    EnrichedBatch, EnrichedItem, EnrichedViolation, FrameReport, MissingItem, Violation,
    ViolationBatch,
};
pub use schema::{Contract, Schema};
pub use transport::{DeliveryError, Transport};
