use std::time::Duration;

use tokio::sync::mpsc;

use crate::envelope::Envelope;

/// Receiving side of an actor's mailbox.
///
/// A mailbox is consumed by exactly one actor task. Envelopes from one sender arrive
/// in the order they were delivered; no ordering holds across different senders.
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::Receiver<Envelope>,
}

impl Mailbox {
    pub fn new(receiver: mpsc::Receiver<Envelope>) -> Self {
        Self { receiver }
    }

    /// Wait for the next envelope. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Take an envelope if one is already queued.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next envelope.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Envelope> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting new envelopes; already queued ones can still be drained.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
