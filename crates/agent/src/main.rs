use std::sync::Arc;

use anyhow::Context as _;
use siteguard_observability::LogFormat;

const LOG_FORMAT_VAR: &str = "SITEGUARD_LOG_FORMAT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_format = match std::env::var(LOG_FORMAT_VAR) {
        Ok(raw) => raw.parse::<LogFormat>().with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?,
        Err(_) => LogFormat::default(),
    };
    siteguard_observability::init(log_format);

    let config = siteguard_infra::AgentConfig::load().context("failed to load configuration")?;
    let catalog = Arc::new(siteguard_infra::load_catalog(&config.rules_path));
    let sink = siteguard_agent::build_sink(&config).context("failed to build alert sink")?;
    let feed = siteguard_agent::build_feed(&config.feed);

    let pipeline = siteguard_agent::start(&config, catalog, sink, feed);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("ctrl-c received");

    pipeline.shutdown().await;
    Ok(())
}
