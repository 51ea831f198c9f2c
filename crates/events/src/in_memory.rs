//! In-process transport: every actor of a topology lives in the same runtime.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::mpsc;

use siteguard_core::Address;

use crate::envelope::Envelope;
use crate::mailbox::Mailbox;
use crate::transport::{DeliveryError, Transport};

/// In-memory address book of bounded mailboxes.
///
/// - No IO
/// - Best-effort, at-most-once
/// - Closed mailboxes are pruned on the next failed delivery
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    routes: RwLock<HashMap<Address, mpsc::Sender<Envelope>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses that currently have a mailbox.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self
            .routes
            .read()
            .map(|routes| routes.keys().cloned().collect())
            .unwrap_or_default();
        addresses.sort();
        addresses
    }

    fn sender_for(&self, address: &Address) -> Result<mpsc::Sender<Envelope>, DeliveryError> {
        let routes = self.routes.read().map_err(|_| DeliveryError::Poisoned)?;
        routes
            .get(address)
            .cloned()
            .ok_or_else(|| DeliveryError::UnknownAddress(address.clone()))
    }

    fn prune(&self, address: &Address) {
        if let Ok(mut routes) = self.routes.write() {
            if routes.get(address).is_some_and(|tx| tx.is_closed()) {
                routes.remove(address);
            }
        }
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn register(&self, address: Address, capacity: usize) -> Mailbox {
        // tokio rejects zero-capacity channels.
        let (tx, rx) = mpsc::channel(capacity.max(1));

        // If the lock is poisoned the mailbox is still returned;
        // it just never receives anything.
        if let Ok(mut routes) = self.routes.write() {
            routes.insert(address, tx);
        }

        Mailbox::new(rx)
    }

    fn deregister(&self, address: &Address) {
        if let Ok(mut routes) = self.routes.write() {
            routes.remove(address);
        }
    }

    fn is_registered(&self, address: &Address) -> bool {
        self.routes
            .read()
            .map(|routes| routes.contains_key(address))
            .unwrap_or(false)
    }

    async fn deliver(&self, envelope: Envelope) -> Result<(), DeliveryError> {
        let recipient = envelope.recipient().clone();
        let tx = self.sender_for(&recipient)?;

        // The lock is released before awaiting capacity.
        if tx.send(envelope).await.is_err() {
            self.prune(&recipient);
            return Err(DeliveryError::MailboxClosed(recipient));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViolationBatch;
    use std::time::Duration;

    fn addr(name: &str) -> Address {
        Address::new(format!("agent1q{name}"))
    }

    fn envelope(to: &str, frame: u64) -> Envelope {
        let batch = ViolationBatch::new(frame, frame, "Michigan", vec![]);
        Envelope::seal(addr("producer"), addr(to), &batch).unwrap()
    }

    #[tokio::test]
    async fn delivers_in_send_order() {
        let transport = InMemoryTransport::new();
        let mut mailbox = transport.register(addr("router"), 8);

        for frame in 1..=3 {
            transport.deliver(envelope("router", frame)).await.unwrap();
        }

        for frame in 1..=3 {
            let env = mailbox.recv().await.unwrap();
            assert_eq!(env.open::<ViolationBatch>().unwrap().frame_start, frame);
        }
        assert!(mailbox.try_recv().is_none());
    }

    #[tokio::test]
    async fn unknown_address_is_reported() {
        let transport = InMemoryTransport::new();
        let err = transport.deliver(envelope("nobody", 1)).await.unwrap_err();
        assert_eq!(err, DeliveryError::UnknownAddress(addr("nobody")));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn dropped_mailbox_is_pruned() {
        let transport = InMemoryTransport::new();
        let mailbox = transport.register(addr("enricher"), 1);
        drop(mailbox);

        let err = transport.deliver(envelope("enricher", 1)).await.unwrap_err();
        assert_eq!(err, DeliveryError::MailboxClosed(addr("enricher")));
        assert!(!transport.is_registered(&addr("enricher")));
    }

    #[tokio::test]
    async fn full_mailbox_applies_backpressure() {
        let transport = std::sync::Arc::new(InMemoryTransport::new());
        let mut mailbox = transport.register(addr("enricher"), 1);

        transport.deliver(envelope("enricher", 1)).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            transport.deliver(envelope("enricher", 2)),
        )
        .await;
        assert!(blocked.is_err(), "second delivery should wait for capacity");

        assert!(mailbox.recv().await.is_some());
        transport.deliver(envelope("enricher", 3)).await.unwrap();
        assert!(mailbox.recv_timeout(Duration::from_millis(50)).await.is_some());
    }

    #[test]
    fn deregister_removes_route() {
        let transport = InMemoryTransport::new();
        let _mailbox = transport.register(addr("router"), 4);
        assert_eq!(transport.addresses(), vec![addr("router")]);

        transport.deregister(&addr("router"));
        assert!(transport.addresses().is_empty());
    }
}
