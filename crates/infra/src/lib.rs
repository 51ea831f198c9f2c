//! Runtime layer: actors, sinks, rule loading and configuration.

pub mod actor;
pub mod actors;
pub mod config;
pub mod retry;
pub mod rules;
pub mod shutdown;
pub mod sink;

pub use actor::{
    Actor, ActorError, ActorHandle, ActorState, Context, DEFAULT_MAILBOX_CAPACITY, spawn,
};
pub use config::{ActorConfig, AgentConfig, ConfigError, FeedConfig};
pub use retry::RetryPolicy;
pub use rules::{RuleFileError, load_catalog, try_load_catalog};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use sink::{AlertSink, InMemorySink, LogSink, SinkError, WebhookConfig, WebhookSink};
