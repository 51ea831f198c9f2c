use std::sync::Arc;

use tracing::{info, warn};

use siteguard_compliance::{Enricher, RuleCatalog};
use siteguard_core::Address;
use siteguard_events::{InMemoryTransport, Transport};
use siteguard_infra::actors::{CameraFeed, EnricherActor, Feed, Producer, Router, SampleFeed};
use siteguard_infra::{
    ActorHandle, AgentConfig, AlertSink, FeedConfig, LogSink, ShutdownTrigger, SinkError,
    WebhookSink, shutdown_channel, spawn,
};

/// A running `Producer → Router → Enricher` topology.
#[derive(Debug)]
pub struct Pipeline {
    transport: Arc<InMemoryTransport>,
    trigger: ShutdownTrigger,
    handles: Vec<ActorHandle>,
    producer: Address,
    router: Address,
    enricher: Address,
}

impl Pipeline {
    pub fn transport(&self) -> Arc<InMemoryTransport> {
        self.transport.clone()
    }

    pub fn producer(&self) -> &Address {
        &self.producer
    }

    pub fn router(&self) -> &Address {
        &self.router
    }

    pub fn enricher(&self) -> &Address {
        &self.enricher
    }

    /// Signal every actor to stop and wait for them.
    pub async fn shutdown(self) {
        info!("shutting down pipeline");
        self.trigger.trigger();
        for handle in self.handles {
            handle.join().await;
        }
    }
}

/// Wire and start the actors.
///
/// Actors start enricher-first so the producer's first batch finds every mailbox
/// registered. The producer is only spawned when `feed` is `Some`.
pub fn start(
    config: &AgentConfig,
    catalog: Arc<RuleCatalog>,
    sink: Arc<dyn AlertSink>,
    feed: Option<Box<dyn Feed>>,
) -> Pipeline {
    let transport = Arc::new(InMemoryTransport::new());
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let (trigger, shutdown) = shutdown_channel();

    let producer = config.producer.address();
    let router = config.router.address();
    let enricher = config.enricher.address();
    let capacity = config.mailbox_capacity;

    let mut handles = Vec::with_capacity(3);

    let enricher_actor =
        EnricherActor::new(Enricher::new(catalog), sink).with_mode(config.dispatch);
    handles.push(spawn(
        enricher_actor,
        enricher.clone(),
        dyn_transport.clone(),
        capacity,
        shutdown.clone(),
    ));

    let router_actor = Router::new(enricher.clone()).with_retry(config.router_retry.clone());
    handles.push(spawn(
        router_actor,
        router.clone(),
        dyn_transport.clone(),
        capacity,
        shutdown.clone(),
    ));

    if let Some(feed) = feed {
        let producer_actor = Producer::new(router.clone(), config.send_interval, feed);
        handles.push(spawn(
            producer_actor,
            producer.clone(),
            dyn_transport,
            capacity,
            shutdown,
        ));
    }

    info!(%producer, %router, %enricher, dispatch = ?config.dispatch, "pipeline started");

    Pipeline {
        transport,
        trigger,
        handles,
        producer,
        router,
        enricher,
    }
}

/// The webhook sink when configured, otherwise the log sink.
pub fn build_sink(config: &AgentConfig) -> Result<Arc<dyn AlertSink>, SinkError> {
    match &config.webhook {
        Some(webhook) => {
            info!(url = %webhook.url, "alerts go to webhook");
            Ok(Arc::new(WebhookSink::new(webhook.clone())?))
        }
        None => {
            warn!("no webhook configured; alerts are only logged");
            Ok(Arc::new(LogSink))
        }
    }
}

/// The producer feed selected by configuration.
///
/// An unloadable sample file falls back to the built-in samples.
pub fn build_feed(config: &FeedConfig) -> Option<Box<dyn Feed>> {
    match config {
        FeedConfig::Samples { path: None } => Some(Box::new(SampleFeed::default())),
        FeedConfig::Samples { path: Some(path) } => match SampleFeed::load(path) {
            Ok(feed) => {
                info!(path = %path.display(), batches = feed.len(), "loaded sample batches");
                Some(Box::new(feed))
            }
            Err(err) => {
                warn!(error = %err, "using built-in sample batches");
                Some(Box::new(SampleFeed::default()))
            }
        },
        FeedConfig::Camera { state } => Some(Box::new(CameraFeed::simulated(state.clone()))),
        FeedConfig::Disabled => None,
    }
}
