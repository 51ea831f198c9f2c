//! In-memory sink for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{AlertSink, SinkError};

/// Records every alert it accepts.
///
/// Can be switched into a failing mode to exercise delivery-error handling.
#[derive(Debug, Default)]
pub struct InMemorySink {
    alerts: Mutex<Vec<String>>,
    failing: AtomicBool,
    posted: Notify,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent posts fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Alerts accepted so far, in order.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Wait until at least `count` alerts have been accepted.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        loop {
            let notified = self.posted.notified();
            let alerts = self.alerts();
            if alerts.len() >= count {
                return alerts;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl AlertSink for InMemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn post(&self, alert: &str) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("sink set to fail".to_string()));
        }
        self.alerts
            .lock()
            .map_err(|_| SinkError::Rejected("sink lock poisoned".to_string()))?
            .push(alert.to_string());
        self.posted.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_alerts_until_set_failing() {
        let sink = InMemorySink::new();
        sink.post("first").await.unwrap();

        sink.set_failing(true);
        assert!(sink.post("second").await.is_err());

        sink.set_failing(false);
        sink.post("third").await.unwrap();
        assert_eq!(sink.wait_for(2).await, vec!["first", "third"]);
    }
}
