use core::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use siteguard_compliance::{AlertFormatter, Enricher};
use siteguard_events::Envelope;

use crate::actor::{Actor, ActorError, Context};
use crate::sink::AlertSink;

/// Where an enriched batch goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Reply to the originating sender only.
    Reply,
    /// Post a formatted alert to the sink only.
    Alert,
    #[default]
    ReplyAndAlert,
}

impl DispatchMode {
    pub fn replies(&self) -> bool {
        matches!(self, DispatchMode::Reply | DispatchMode::ReplyAndAlert)
    }

    pub fn alerts(&self) -> bool {
        matches!(self, DispatchMode::Alert | DispatchMode::ReplyAndAlert)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown dispatch mode `{0}` (expected reply, alert or reply_and_alert)")]
pub struct ParseDispatchModeError(String);

impl FromStr for DispatchMode {
    type Err = ParseDispatchModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reply" => Ok(DispatchMode::Reply),
            "alert" => Ok(DispatchMode::Alert),
            "reply_and_alert" | "both" => Ok(DispatchMode::ReplyAndAlert),
            _ => Err(ParseDispatchModeError(s.to_string())),
        }
    }
}

/// Enriches violation messages and dispatches the result.
///
/// A failed reply or a failing sink is logged; neither keeps the other output from going out.
/// An alert still in flight is abandoned on shutdown.
pub struct EnricherActor {
    enricher: Enricher,
    formatter: AlertFormatter,
    sink: Arc<dyn AlertSink>,
    mode: DispatchMode,
}

impl core::fmt::Debug for EnricherActor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnricherActor")
            .field("sink", &self.sink.name())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl EnricherActor {
    pub fn new(enricher: Enricher, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            enricher,
            formatter: AlertFormatter::default(),
            sink,
            mode: DispatchMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

}

#[async_trait]
impl Actor for EnricherActor {
    fn name(&self) -> &str {
        "enricher"
    }

    async fn on_message(&mut self, ctx: &Context, envelope: Envelope) -> Result<(), ActorError> {
        let schema = envelope.schema();
        if !schema.is_violation() {
            return Err(ActorError::Unsupported(schema));
        }

        let enrichment = match self.enricher.enrich_message(schema, envelope.body()) {
            Ok(enrichment) => enrichment,
            Err(err) => {
                error!(
                    message_id = %envelope.id(),
                    sender = %envelope.sender(),
                    %schema,
                    error = %err,
                    "rejected batch"
                );
                return Ok(());
            }
        };

        for skipped in &enrichment.skipped {
            warn!(
                message_id = %envelope.id(),
                index = skipped.index,
                reason = %skipped.reason,
                "skipped malformed violation entry"
            );
        }

        let batch = &enrichment.batch;
        info!(
            message_id = %envelope.id(),
            frame_start = batch.frame_start,
            frame_end = batch.frame_end,
            state = %batch.state,
            persons = batch.persons,
            items = batch.item_count(),
            fallbacks = enrichment.fallbacks,
            "enriched batch"
        );

        if self.mode.replies() {
            if let Err(err) = ctx.reply(&envelope, batch).await {
                warn!(
                    message_id = %envelope.id(),
                    sender = %envelope.sender(),
                    error = %err,
                    "reply not delivered"
                );
            }
        }

        if self.mode.alerts() {
            let alert = self.formatter.format(batch);
            let mut shutdown = ctx.shutdown();
            let posted = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    warn!(
                        message_id = %envelope.id(),
                        sink = self.sink.name(),
                        "alert abandoned at shutdown"
                    );
                    return Err(ActorError::ShuttingDown);
                }
                posted = self.sink.post(&alert) => posted,
            };
            let sink = self.sink.name();
            match posted {
                Ok(()) => info!(message_id = %envelope.id(), sink, "alert dispatched"),
                Err(err) => {
                    error!(message_id = %envelope.id(), sink, error = %err, "alert delivery failed")
                }
            }
        }

        Ok(())
    }
}
