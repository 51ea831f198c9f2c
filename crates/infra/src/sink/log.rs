use async_trait::async_trait;
use tracing::info;

use super::{AlertSink, SinkError};

/// Writes alerts to the process log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn post(&self, alert: &str) -> Result<(), SinkError> {
        info!(alert = %alert, "compliance alert");
        Ok(())
    }
}
