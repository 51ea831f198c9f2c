use async_trait::async_trait;
use tracing::{error, info, warn};

use siteguard_core::Address;
use siteguard_events::{Envelope, decode_header};

use crate::actor::{Actor, ActorError, Context};
use crate::retry::RetryPolicy;

/// Validates violation messages structurally and forwards them to the enricher.
///
/// The envelope is forwarded as is: same id, same body, same originating sender.
/// Batches with an unusable header are logged and dropped without a reply.
#[derive(Debug, Clone)]
pub struct Router {
    enricher: Address,
    retry: RetryPolicy,
}

impl Router {
    pub fn new(enricher: Address) -> Self {
        Self {
            enricher,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn forward(&self, ctx: &Context, envelope: Envelope) -> Result<(), ActorError> {
        let mut shutdown = ctx.shutdown();
        let mut retry = 0;
        loop {
            let err = match ctx.forward(envelope.clone(), self.enricher.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            retry += 1;
            if !err.is_transient() || !self.retry.allows(retry) {
                return Err(err.into());
            }

            let delay = self.retry.backoff(retry);
            warn!(
                message_id = %envelope.id(),
                error = %err,
                retry,
                delay_ms = delay.as_millis() as u64,
                "forward failed; retrying"
            );
            tokio::select! {
                _ = shutdown.wait() => return Err(ActorError::ShuttingDown),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[async_trait]
impl Actor for Router {
    fn name(&self) -> &str {
        "router"
    }

    async fn on_message(&mut self, ctx: &Context, envelope: Envelope) -> Result<(), ActorError> {
        let schema = envelope.schema();
        if !schema.is_violation() {
            return Err(ActorError::Unsupported(schema));
        }

        let header = match decode_header(schema, envelope.body()) {
            Ok(header) => header,
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

        if !header.persons_consistent() {
            warn!(
                message_id = %envelope.id(),
                persons = header.persons,
                distinct_persons = header.distinct_persons,
                "persons count disagrees with violations"
            );
        }

        info!(
            message_id = %envelope.id(),
            sender = %envelope.sender(),
            %schema,
            frame_start = header.frame_start,
            frame_end = header.frame_end,
            state = %header.state,
            entries = header.entries,
            "routing batch to enricher"
        );

        self.forward(ctx, envelope).await
    }
}
