use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use siteguard_core::{Address, PersonId};
use siteguard_events::{
    EnrichedBatch, Envelope, FrameReport, MissingItem, Schema, Violation, ViolationBatch,
    decode_violations,
};

use crate::actor::{Actor, ActorError, Context};

/// One message emitted by a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    Batch(ViolationBatch),
    /// Legacy single-frame report, sent as `violation_frame.v1`.
    Frame(FrameReport),
}

impl FeedMessage {
    pub fn schema(&self) -> Schema {
        match self {
            FeedMessage::Batch(_) => Schema::ViolationBatchV2,
            FeedMessage::Frame(_) => Schema::ViolationFrameV1,
        }
    }

    pub fn seal(&self, sender: Address, recipient: Address) -> Result<Envelope, serde_json::Error> {
        match self {
            FeedMessage::Batch(batch) => Envelope::seal(sender, recipient, batch),
            FeedMessage::Frame(report) => Envelope::seal(sender, recipient, report),
        }
    }
}

/// Source of violation messages for the producer.
pub trait Feed: Send + 'static {
    /// Next message to send; `None` ends the feed.
    fn next_message(&mut self) -> Option<FeedMessage>;
}

#[derive(Debug, Error)]
pub enum FeedLoadError {
    #[error("failed to read sample file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sample file {path} is not a JSON array of batches: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sample file {0} contains no usable batches")]
    Empty(PathBuf),
}

/// Cycles through a fixed list of batches forever.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    batches: Vec<ViolationBatch>,
    next: usize,
}

impl SampleFeed {
    pub fn new(batches: Vec<ViolationBatch>) -> Self {
        Self { batches, next: 0 }
    }

    /// The two Michigan construction-site batches used for demos.
    pub fn michigan() -> Self {
        let items = |codes: &[&str]| -> Vec<MissingItem> {
            codes.iter().filter_map(|c| MissingItem::new(*c).ok()).collect()
        };

        Self::new(vec![
            ViolationBatch::new(
                1,
                14,
                "Michigan",
                vec![Violation::new(PersonId(1), items(&["hardhat", "mask", "safety vest"]))],
            ),
            ViolationBatch::new(
                28,
                57,
                "Michigan",
                vec![
                    Violation::new(PersonId(1), items(&["hardhat"])),
                    Violation::new(PersonId(2), items(&["mask", "safety vest"])),
                ],
            ),
        ])
    }

    /// Load batches from a JSON array file.
    ///
    /// Entries go through the lenient decoder: a missing `persons` is derived, bad
    /// person entries are dropped, and batches with an unusable header are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeedLoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FeedLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<JsonValue> =
            serde_json::from_str(&raw).map_err(|source| FeedLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut batches = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match decode_violations(Schema::ViolationBatchV2, entry) {
                Ok(decoded) => {
                    for skipped in &decoded.skipped {
                        warn!(
                            path = %path.display(),
                            batch = index,
                            entry = skipped.index,
                            reason = %skipped.reason,
                            "skipped sample entry"
                        );
                    }
                    batches.push(decoded.value);
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        batch = index,
                        error = %err,
                        "skipped sample batch"
                    )
                }
            }
        }

        if batches.is_empty() {
            return Err(FeedLoadError::Empty(path.to_path_buf()));
        }
        Ok(Self::new(batches))
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl Default for SampleFeed {
    fn default() -> Self {
        Self::michigan()
    }
}

impl Feed for SampleFeed {
    fn next_message(&mut self) -> Option<FeedMessage> {
        if self.batches.is_empty() {
            return None;
        }
        let batch = self.batches[self.next % self.batches.len()].clone();
        self.next = (self.next + 1) % self.batches.len();
        Some(FeedMessage::Batch(batch))
    }
}

/// Simulated camera: the same per-person detections on every frame, sent as
/// legacy single-frame reports with an increasing frame id.
#[derive(Debug, Clone)]
pub struct CameraFeed {
    state: String,
    detections: Vec<(PersonId, Vec<String>)>,
    frame_id: u64,
}

impl CameraFeed {
    pub fn new(state: impl Into<String>, detections: Vec<(PersonId, Vec<String>)>) -> Self {
        Self {
            state: state.into(),
            detections,
            frame_id: 0,
        }
    }

    /// Two workers: one without goggles, one without hardhat and gloves.
    pub fn simulated(state: impl Into<String>) -> Self {
        Self::new(
            state,
            vec![
                (PersonId(1), vec!["safety_goggles".to_string()]),
                (PersonId(2), vec!["hardhat".to_string(), "gloves".to_string()]),
            ],
        )
    }
}

impl Feed for CameraFeed {
    fn next_message(&mut self) -> Option<FeedMessage> {
        self.frame_id += 1;
        Some(FeedMessage::Frame(FrameReport::from_detections(
            self.frame_id,
            self.state.clone(),
            self.detections.clone(),
        )))
    }
}

/// Sends one feed message to the router per tick and logs enriched replies.
pub struct Producer {
    router: Address,
    interval: Duration,
    feed: Option<Box<dyn Feed>>,
    emitter: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for Producer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Producer")
            .field("router", &self.router)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Producer {
    pub fn new(router: Address, interval: Duration, feed: Box<dyn Feed>) -> Self {
        Self {
            router,
            interval,
            feed: Some(feed),
            emitter: None,
        }
    }
}

#[async_trait]
impl Actor for Producer {
    fn name(&self) -> &str {
        "producer"
    }

    async fn on_start(&mut self, ctx: &Context) -> Result<(), ActorError> {
        if let Some(feed) = self.feed.take() {
            let period = self.interval.max(Duration::from_millis(1));
            let emit = emit_loop(ctx.clone(), self.router.clone(), period, feed);
            self.emitter = Some(tokio::spawn(emit));
        }
        Ok(())
    }

    async fn on_message(&mut self, _ctx: &Context, envelope: Envelope) -> Result<(), ActorError> {
        let schema = envelope.schema();
        if schema != Schema::EnrichedBatchV2 {
            return Err(ActorError::Unsupported(schema));
        }

        let batch: EnrichedBatch = envelope.open()?;
        info!(
            message_id = %envelope.id(),
            from = %envelope.sender(),
            frame_start = batch.frame_start,
            frame_end = batch.frame_end,
            state = %batch.state,
            persons = batch.persons,
            items = batch.item_count(),
            "received enriched batch"
        );
        for (person_id, item) in batch.items() {
            debug!(
                %person_id,
                item = %item.item,
                rule = %item.rule,
                consequence = %item.consequence,
                "enriched item"
            );
        }
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &Context) {
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }
    }
}

async fn emit_loop(ctx: Context, router: Address, period: Duration, mut feed: Box<dyn Feed>) {
    let mut shutdown = ctx.shutdown();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        let Some(message) = feed.next_message() else {
            info!("feed exhausted");
            break;
        };
        let envelope = match message.seal(ctx.address().clone(), router.clone()) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "failed to encode feed message");
                continue;
            }
        };
        let message_id = envelope.id();
        let schema = envelope.schema();

        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            sent = ctx.deliver(envelope) => match sent {
                Ok(()) => info!(%message_id, %schema, router = %router, "sent batch"),
                Err(err) => warn!(%message_id, error = %err, "failed to send batch"),
            }
        }
    }
    debug!("producer feed loop stopped");
}
