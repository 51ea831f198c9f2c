//! Agent configuration: an optional JSON file, then environment overrides.
//!
//! | variable | effect |
//! |---|---|
//! | `SITEGUARD_CONFIG` | path of the JSON config file (otherwise defaults) |
//! | `SITEGUARD_RULES` | rule file path |
//! | `SITEGUARD_WEBHOOK_URL` | enables the webhook sink (empty disables it) |
//! | `SITEGUARD_INTERVAL_SECS` | producer send period |
//! | `SITEGUARD_DISPATCH` | `reply`, `alert` or `reply_and_alert` |
//! | `SITEGUARD_FEED` | `samples`, `samples:<path>`, `camera` or `camera:<state>` |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use siteguard_core::Address;

use crate::actor::DEFAULT_MAILBOX_CAPACITY;
use crate::actors::DispatchMode;
use crate::retry::{RetryPolicy, millis};
use crate::sink::WebhookConfig;

pub const CONFIG_VAR: &str = "SITEGUARD_CONFIG";
pub const RULES_VAR: &str = "SITEGUARD_RULES";
pub const WEBHOOK_URL_VAR: &str = "SITEGUARD_WEBHOOK_URL";
pub const INTERVAL_VAR: &str = "SITEGUARD_INTERVAL_SECS";
pub const DISPATCH_VAR: &str = "SITEGUARD_DISPATCH";
pub const FEED_VAR: &str = "SITEGUARD_FEED";

const DEFAULT_STATE: &str = "Michigan";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Identity of one actor: an explicit address, or one derived from name + seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    #[serde(default)]
    pub seed: String,
    #[serde(default)]
    pub address: Option<Address>,
}

impl ActorConfig {
    pub fn new(name: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: seed.into(),
            address: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
            .clone()
            .unwrap_or_else(|| Address::from_seed(&self.name, &self.seed))
    }
}

/// What the producer sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedConfig {
    /// Built-in sample batches, or batches loaded from `path`.
    Samples {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Simulated camera detections for one jurisdiction.
    Camera { state: String },
    /// No producer feed; batches come from elsewhere.
    Disabled,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig::Samples { path: None }
    }
}

impl core::str::FromStr for FeedConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind.trim(), Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (s.trim(), None),
        };
        match kind.to_ascii_lowercase().as_str() {
            "samples" => Ok(FeedConfig::Samples {
                path: arg.map(PathBuf::from),
            }),
            "camera" => Ok(FeedConfig::Camera {
                state: arg.unwrap_or(DEFAULT_STATE).to_string(),
            }),
            "disabled" | "none" | "off" => Ok(FeedConfig::Disabled),
            other => Err(format!("unknown feed `{other}` (expected samples, camera or disabled)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub rules_path: PathBuf,
    pub mailbox_capacity: usize,
    pub dispatch: DispatchMode,
    pub feed: FeedConfig,
    #[serde(rename = "send_interval_ms", with = "millis")]
    pub send_interval: Duration,
    pub producer: ActorConfig,
    pub router: ActorConfig,
    pub enricher: ActorConfig,
    pub router_retry: RetryPolicy,
    pub webhook: Option<WebhookConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("osha.json"),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            dispatch: DispatchMode::default(),
            feed: FeedConfig::default(),
            send_interval: Duration::from_secs(2),
            producer: ActorConfig::new("ClientSimulator", "client simulator seed phrase"),
            router: ActorConfig::new("RequestAgent", "request agent seed"),
            enricher: ActorConfig::new("Compliance", "alice recovery phrase"),
            router_retry: RetryPolicy::default(),
            webhook: None,
        }
    }
}

impl AgentConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for environment variables.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `SITEGUARD_*` overrides.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(rules) = lookup(RULES_VAR).filter(|v| !v.trim().is_empty()) {
            self.rules_path = PathBuf::from(rules);
        }

        if let Some(url) = lookup(WEBHOOK_URL_VAR) {
            let url = url.trim();
            self.webhook = match self.webhook.take() {
                _ if url.is_empty() => None,
                Some(existing) => Some(WebhookConfig {
                    url: url.to_string(),
                    ..existing
                }),
                None => Some(WebhookConfig::new(url)),
            };
        }

        if let Some(secs) = lookup(INTERVAL_VAR) {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: INTERVAL_VAR,
                reason: format!("expected whole seconds, got `{secs}`"),
            })?;
            self.send_interval = Duration::from_secs(secs);
        }

        if let Some(mode) = lookup(DISPATCH_VAR) {
            self.dispatch = mode.parse().map_err(|e: crate::actors::ParseDispatchModeError| {
                ConfigError::InvalidEnv {
                    var: DISPATCH_VAR,
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(feed) = lookup(FEED_VAR) {
            self.feed = feed
                .parse()
                .map_err(|reason| ConfigError::InvalidEnv { var: FEED_VAR, reason })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid("mailbox_capacity must be at least 1".to_string()));
        }
        if self.send_interval.is_zero() {
            return Err(ConfigError::Invalid("send interval must be positive".to_string()));
        }

        let addresses: BTreeSet<String> = [&self.producer, &self.router, &self.enricher]
            .iter()
            .map(|a| a.address().as_str().to_string())
            .collect();
        if addresses.len() != 3 {
            return Err(ConfigError::Invalid(
                "producer, router and enricher need distinct addresses".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AgentConfig::load_with(env(&[])).unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.rules_path, PathBuf::from("osha.json"));
        assert_eq!(config.send_interval, Duration::from_secs(2));
        assert!(config.webhook.is_none());
        assert!(config.router.address().as_str().starts_with("agent1q"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AgentConfig::load_with(env(&[
            (RULES_VAR, "/etc/siteguard/rules.json"),
            (WEBHOOK_URL_VAR, "https://hooks.example.test/alerts"),
            (INTERVAL_VAR, "10"),
            (DISPATCH_VAR, "alert"),
            (FEED_VAR, "camera:Ohio"),
        ]))
        .unwrap();

        assert_eq!(config.rules_path, PathBuf::from("/etc/siteguard/rules.json"));
        assert_eq!(config.webhook.unwrap().url, "https://hooks.example.test/alerts");
        assert_eq!(config.send_interval, Duration::from_secs(10));
        assert_eq!(config.dispatch, DispatchMode::Alert);
        assert_eq!(config.feed, FeedConfig::Camera { state: "Ohio".into() });
    }

    #[test]
    fn invalid_environment_values_are_reported() {
        let err = AgentConfig::load_with(env(&[(INTERVAL_VAR, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: INTERVAL_VAR, .. }));

        let err = AgentConfig::load_with(env(&[(DISPATCH_VAR, "carrier pigeon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: DISPATCH_VAR, .. }));

        let err = AgentConfig::load_with(env(&[(INTERVAL_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "mailbox_capacity": 8,
                "send_interval_ms": 500,
                "feed": {{"kind": "samples", "path": "batches.json"}},
                "router": {{"name": "router", "address": "agent1qrouter"}},
                "webhook": {{"url": "https://hooks.example.test/a", "timeout_ms": 1500}}
            }}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = AgentConfig::load_with(env(&[
            (CONFIG_VAR, path.as_str()),
            (WEBHOOK_URL_VAR, "https://hooks.example.test/b"),
        ]))
        .unwrap();

        assert_eq!(config.mailbox_capacity, 8);
        assert_eq!(config.send_interval, Duration::from_millis(500));
        assert_eq!(config.feed, FeedConfig::Samples { path: Some("batches.json".into()) });
        assert_eq!(config.router.address(), Address::new("agent1qrouter"));
        assert_eq!(config.enricher, AgentConfig::default().enricher);

        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url, "https://hooks.example.test/b");
        assert_eq!(webhook.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn empty_webhook_url_disables_webhook() {
        let mut config = AgentConfig {
            webhook: Some(WebhookConfig::new("https://hooks.example.test/a")),
            ..AgentConfig::default()
        };
        config.apply_env(env(&[(WEBHOOK_URL_VAR, "")])).unwrap();
        assert!(config.webhook.is_none());
    }

    #[test]
    fn duplicate_addresses_are_rejected() {
        let config = AgentConfig {
            router: AgentConfig::default().enricher,
            ..AgentConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parses_feed_shorthand() {
        assert_eq!("samples".parse::<FeedConfig>().unwrap(), FeedConfig::Samples { path: None });
        assert_eq!(
            "camera".parse::<FeedConfig>().unwrap(),
            FeedConfig::Camera { state: "Michigan".into() }
        );
        assert_eq!("off".parse::<FeedConfig>().unwrap(), FeedConfig::Disabled);
        assert!("radio".parse::<FeedConfig>().is_err());
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let err = AgentConfig::load_with(env(&[(CONFIG_VAR, "/nonexistent/siteguard.json")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
