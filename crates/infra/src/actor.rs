//! Actor runtime: addressable tasks with a bounded mailbox.
//!
//! ## Lifecycle
//!
//! `Created → Running → Stopped`.
//!
//! - The mailbox is registered when the actor is spawned, so envelopes sent right
//!   after `spawn` returns are queued rather than lost.
//! - On entering `Running` the actor logs its address and runs `on_start`.
//! - Envelopes are handled **one at a time** in arrival order. A failing handler is
//!   logged; the actor keeps running.
//! - The loop exits on shutdown (or when the mailbox is closed), deregisters the
//!   address, runs `on_stop`, and moves to `Stopped`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use siteguard_core::{Address, MessageId, ValidationError};
use siteguard_events::{Contract, DeliveryError, Envelope, Mailbox, OpenError, Schema, Transport};

use crate::shutdown::Shutdown;

/// Default mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActorState {
    Created,
    Running,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ActorError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error("unsupported message schema `{0}`")]
    Unsupported(Schema),

    #[error("shutdown in progress")]
    ShuttingDown,
}

/// Message-driven unit of execution.
#[async_trait]
pub trait Actor: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn on_start(&mut self, _ctx: &Context) -> Result<(), ActorError> {
        Ok(())
    }

    async fn on_message(&mut self, ctx: &Context, envelope: Envelope) -> Result<(), ActorError>;

    async fn on_stop(&mut self, _ctx: &Context) {}
}

/// What an actor can do to the outside world.
///
/// Cheap to clone; background tasks spawned by an actor take their own copy.
#[derive(Clone)]
pub struct Context {
    address: Address,
    transport: Arc<dyn Transport>,
    shutdown: Shutdown,
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("address", &self.address)
            .field("shutdown", &self.shutdown.is_triggered())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(address: Address, transport: Arc<dyn Transport>, shutdown: Shutdown) -> Self {
        Self {
            address,
            transport,
            shutdown,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// A fresh listener for the topology's shutdown signal.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Seal `message` from this actor and deliver it to `recipient`.
    pub async fn send<C: Contract>(
        &self,
        recipient: &Address,
        message: &C,
    ) -> Result<MessageId, ActorError> {
        let envelope = Envelope::seal(self.address.clone(), recipient.clone(), message)?;
        let id = envelope.id();
        self.transport.deliver(envelope).await?;
        Ok(id)
    }

    /// Deliver an already-sealed envelope as is.
    pub async fn deliver(&self, envelope: Envelope) -> Result<(), DeliveryError> {
        self.transport.deliver(envelope).await
    }

    /// Pass `envelope` on to `to`, keeping its id, sender and body.
    pub async fn forward(&self, envelope: Envelope, to: Address) -> Result<(), DeliveryError> {
        self.transport.deliver(envelope.readdress(to)).await
    }

    /// Answer the originating sender of `request`.
    pub async fn reply<C: Contract>(
        &self,
        request: &Envelope,
        message: &C,
    ) -> Result<MessageId, ActorError> {
        self.send(request.sender(), message).await
    }
}

/// Handle to observe and join a spawned actor.
#[derive(Debug)]
pub struct ActorHandle {
    name: String,
    address: Address,
    state: watch::Receiver<ActorState>,
    join: JoinHandle<()>,
}

impl ActorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn state(&self) -> ActorState {
        *self.state.borrow()
    }

    /// Wait until the actor reaches `target` (or has already passed it).
    pub async fn wait_for(&mut self, target: ActorState) {
        let _ = self
            .state
            .wait_for(|s| *s == target || *s == ActorState::Stopped)
            .await;
    }

    /// Wait for the actor task to finish.
    pub async fn join(self) {
        if let Err(err) = self.join.await {
            warn!(actor = %self.name, error = %err, "actor task panicked");
        }
    }
}

/// Spawn `actor` on the current tokio runtime under `address`.
pub fn spawn<A: Actor>(
    actor: A,
    address: Address,
    transport: Arc<dyn Transport>,
    capacity: usize,
    shutdown: Shutdown,
) -> ActorHandle {
    let name = actor.name().to_string();
    let (state_tx, state_rx) = watch::channel(ActorState::Created);
    let mailbox = transport.register(address.clone(), capacity);
    let ctx = Context::new(address.clone(), transport, shutdown);

    let join = tokio::spawn(actor_loop(actor, ctx, mailbox, state_tx));

    ActorHandle {
        name,
        address,
        state: state_rx,
        join,
    }
}

async fn actor_loop<A: Actor>(
    mut actor: A,
    ctx: Context,
    mut mailbox: Mailbox,
    state: watch::Sender<ActorState>,
) {
    let name = actor.name().to_string();
    let mut shutdown = ctx.shutdown();

    state.send_replace(ActorState::Running);
    info!(actor = %name, address = %ctx.address(), "actor started");

    if let Err(err) = actor.on_start(&ctx).await {
        warn!(actor = %name, error = %err, "actor startup hook failed");
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            next = mailbox.recv() => {
                let Some(envelope) = next else { break };
                let message_id = envelope.id();
                let schema = envelope.schema();
                debug!(
                    actor = %name,
                    %message_id,
                    %schema,
                    sender = %envelope.sender(),
                    "handling message"
                );

                if let Err(err) = actor.on_message(&ctx, envelope).await {
                    warn!(
                        actor = %name,
                        %message_id,
                        %schema,
                        error = %err,
                        "message handler failed"
                    );
                }
            }
        }
    }

    mailbox.close();
    ctx.transport.deregister(ctx.address());
    actor.on_stop(&ctx).await;
    state.send_replace(ActorState::Stopped);
    info!(actor = %name, address = %ctx.address(), "actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;
    use siteguard_events::{InMemoryTransport, ViolationBatch};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Records the frame of every batch it sees; fails on odd frames.
    struct Recorder {
        seen: mpsc::UnboundedSender<u64>,
    }

    #[async_trait]
    impl Actor for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_message(
            &mut self,
            _ctx: &Context,
            envelope: Envelope,
        ) -> Result<(), ActorError> {
            let batch: ViolationBatch = envelope.open()?;
            let _ = self.seen.send(batch.frame_start);
            if batch.frame_start % 2 == 1 {
                return Err(ActorError::Validation(ValidationError::invalid("frame_start", "odd")));
            }
            Ok(())
        }
    }

    fn addr(name: &str) -> Address {
        Address::new(format!("agent1q{name}"))
    }

    #[tokio::test]
    async fn runs_messages_in_order_and_survives_handler_errors() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());
        let (trigger, shutdown) = shutdown_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let recorder = Recorder { seen: tx };
        let mut handle = spawn(recorder, addr("recorder"), transport.clone(), 8, shutdown.clone());
        handle.wait_for(ActorState::Running).await;
        assert_eq!(handle.state(), ActorState::Running);

        let sender = Context::new(addr("test"), transport.clone(), shutdown);
        for frame in 1..=4 {
            let batch = ViolationBatch::new(frame, frame, "Michigan", vec![]);
            sender.send(&addr("recorder"), &batch).await.unwrap();
        }

        for expected in 1..=4 {
            let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
            assert_eq!(got, Some(expected));
        }

        trigger.trigger();
        handle.wait_for(ActorState::Stopped).await;
        assert_eq!(handle.state(), ActorState::Stopped);
        assert!(!transport.is_registered(&addr("recorder")));
        handle.join().await;
    }

    #[tokio::test]
    async fn mailbox_is_registered_before_the_task_runs() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());
        let (trigger, shutdown) = shutdown_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let recorder = Recorder { seen: tx };
        let handle = spawn(recorder, addr("recorder"), transport.clone(), 8, shutdown.clone());
        assert!(transport.is_registered(handle.address()));

        let sender = Context::new(addr("test"), transport, shutdown);
        sender
            .send(&addr("recorder"), &ViolationBatch::new(2, 2, "Ohio", vec![]))
            .await
            .unwrap();
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got, Some(2));

        trigger.trigger();
        handle.join().await;
    }

    #[tokio::test]
    async fn reply_targets_original_sender() {
        let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());
        let (_trigger, shutdown) = shutdown_channel();
        let mut origin_mailbox = transport.register(addr("origin"), 4);

        let batch = ViolationBatch::new(1, 1, "Ohio", vec![]);
        let request = Envelope::seal(addr("origin"), addr("router"), &batch)
            .unwrap()
            .readdress(addr("enricher"));

        let enricher = Context::new(addr("enricher"), transport, shutdown);
        enricher
            .reply(&request, &ViolationBatch::new(9, 9, "Ohio", vec![]))
            .await
            .unwrap();

        let reply = origin_mailbox.recv().await.unwrap();
        assert_eq!(reply.sender(), &addr("enricher"));
        assert_eq!(reply.open::<ViolationBatch>().unwrap().frame_start, 9);
    }
}
