//! Chat-style webhook sink (`POST {"content": "..."}`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AlertSink, SinkError};
use crate::retry::{RetryPolicy, millis};

/// Chat webhooks reject messages longer than this many characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(rename = "timeout_ms", with = "millis", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: default_timeout(),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Posts alerts to an HTTP webhook, retrying transient failures.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> Result<Self, SinkError> {
        if config.url.trim().is_empty() {
            return Err(SinkError::Rejected("webhook url is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    async fn post_once(&self, payload: &serde_json::Value) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SinkError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn post(&self, alert: &str) -> Result<(), SinkError> {
        let payload = serde_json::json!({
            "content": truncate_chars(alert, self.config.max_content_chars),
        });

        let mut retry = 0;
        loop {
            let err = match self.post_once(&payload).await {
                Ok(()) => {
                    debug!(retries = retry, "webhook accepted alert");
                    return Ok(());
                }
                Err(err) => err,
            };
            retry += 1;
            if !err.is_retryable() || !self.config.retry.allows(retry) {
                return Err(err);
            }

            let delay = self.config.retry.backoff(retry);
            warn!(
                error = %err,
                retry,
                delay_ms = delay.as_millis() as u64,
                "webhook post failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::Request(err.to_string())
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Minimal HTTP endpoint: answers each connection with the next status in
    /// `statuses` and forwards the request body.
    async fn serve(statuses: Vec<u16>) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for status in statuses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let body = read_body(&mut socket).await;
                let _ = tx.send(body);
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        (url, rx)
    }

    async fn read_body(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + length {
                    let start = split + 4;
                    return String::from_utf8_lossy(&buf[start..start + length]).to_string();
                }
            }
        }
        String::new()
    }

    fn config(url: String, retry: RetryPolicy) -> WebhookConfig {
        WebhookConfig {
            retry,
            ..WebhookConfig::new(url)
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("⚠️ abcdef", 4), "⚠️ …");
        assert_eq!(truncate_chars("abcdef", 4).chars().count(), 4);
    }

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(
            WebhookSink::new(WebhookConfig::new("  ")),
            Err(SinkError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn posts_alert_as_content_field() {
        let (url, mut bodies) = serve(vec![204]).await;
        let sink = WebhookSink::new(config(url, RetryPolicy::none())).unwrap();

        sink.post("⚠️ Compliance Alert").await.unwrap();

        let body = bodies.recv().await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body, serde_json::json!({"content": "⚠️ Compliance Alert"}));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let (url, mut bodies) = serve(vec![503, 200]).await;
        let retry = RetryPolicy::constant(2, Duration::from_millis(5));
        let sink = WebhookSink::new(config(url, retry)).unwrap();

        sink.post("alert").await.unwrap();
        assert!(bodies.recv().await.is_some());
        assert!(bodies.recv().await.is_some());
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, mut bodies) = serve(vec![400]).await;
        let retry = RetryPolicy::constant(3, Duration::from_millis(5));
        let sink = WebhookSink::new(config(url, retry)).unwrap();

        let err = sink.post("alert").await.unwrap_err();
        assert!(matches!(err, SinkError::Status { status: 400, .. }));
        assert!(bodies.recv().await.is_some());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        drop(listener);

        let sink = WebhookSink::new(config(url, RetryPolicy::none())).unwrap();
        assert!(matches!(sink.post("alert").await, Err(SinkError::Request(_))));
    }
}
