//! Fluentd publisher
//!
//! Reads lines from stdin and publishes each one as a message to a
//! `fluentd://` topic.
//!
//! Usage:
//!   FLUENTD_UPSTREAM_URL=tcp://localhost:24224/app \
//!   PUBSUB_TOPIC_URL=fluentd://web \
//!   tail -f access.log | pubsub-fluentd

use anyhow::Context;
use pubsub_core::{Message, UrlMux};
use pubsub_fluentd::{
    parse_descriptor, register_with, FluentClient, ForwardClient, PublisherConfig, UrlOpener,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PublisherConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.log_level);

    tracing::info!("Starting Fluentd publisher");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;
    tracing::info!("Topic: {}", config.topic_url);

    let (fluent_config, tag_prefix) =
        parse_descriptor(&config.upstream_url).context("Invalid Fluentd upstream URL")?;
    tracing::info!(
        "Fluentd upstream: {}://{} (tag prefix: {:?})",
        fluent_config.network,
        fluent_config.address(),
        tag_prefix
    );

    let client: Arc<dyn FluentClient> = Arc::new(ForwardClient::new(fluent_config));
    let mut mux = UrlMux::new();
    register_with(&mut mux, UrlOpener::new(client, tag_prefix))?;

    let topic = mux
        .open_topic(&config.topic_url)
        .await
        .with_context(|| format!("Failed to open topic {}", config.topic_url))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut published: u64 = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                None
            }
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut message = Message::new(line).with_metadata_map(config.attributes.clone());
        if let Err(e) = topic.send(&mut message).await {
            tracing::error!(code = %topic.error_code(&e), "Failed to publish message: {}", e);
            topic.close().await.ok();
            return Err(e.into());
        }
        published += 1;
    }

    topic.close().await?;
    tracing::info!("Fluentd publisher stopped after {} messages", published);
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
