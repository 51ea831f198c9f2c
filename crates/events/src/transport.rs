//! Mailbox delivery abstraction (mechanics only).
//!
//! A `Transport` maps addresses to mailboxes and moves envelopes between them.
//!
//! ## Delivery guarantees
//!
//! Delivery is **at-most-once, best-effort**:
//! - a successful `deliver` means the envelope was queued, not that it was handled
//! - there is no acknowledgement and no redelivery; callers that need more must
//!   retry on `DeliveryError` themselves (see the router)
//! - envelopes from one sender to one receiver keep their order
//!
//! ## Backpressure
//!
//! Mailboxes are bounded. `deliver` waits for capacity instead of dropping.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use siteguard_core::Address;

use crate::envelope::Envelope;
use crate::mailbox::Mailbox;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No mailbox is registered under the recipient address.
    #[error("no mailbox registered for {0}")]
    UnknownAddress(Address),

    /// The recipient's mailbox was dropped (actor stopped).
    #[error("mailbox for {0} is closed")]
    MailboxClosed(Address),

    /// Internal routing table lock was poisoned.
    #[error("routing table poisoned")]
    Poisoned,
}

impl DeliveryError {
    /// Whether retrying later could succeed (the recipient may not have started yet).
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::UnknownAddress(_) | DeliveryError::MailboxClosed(_))
    }
}

/// Address-based envelope delivery.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create (or replace) the mailbox for `address`.
    fn register(&self, address: Address, capacity: usize) -> Mailbox;

    /// Remove the mailbox for `address`; later deliveries fail with `UnknownAddress`.
    fn deregister(&self, address: &Address);

    fn is_registered(&self, address: &Address) -> bool;

    /// Queue `envelope` in its recipient's mailbox, waiting for capacity.
    async fn deliver(&self, envelope: Envelope) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn register(&self, address: Address, capacity: usize) -> Mailbox {
        (**self).register(address, capacity)
    }

    fn deregister(&self, address: &Address) {
        (**self).deregister(address)
    }

    fn is_registered(&self, address: &Address) -> bool {
        (**self).is_registered(address)
    }

    async fn deliver(&self, envelope: Envelope) -> Result<(), DeliveryError> {
        (**self).deliver(envelope).await
    }
}
