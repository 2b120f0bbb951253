//! Configuration for the `pubsub-fluentd` publisher binary

use crate::opener::{SCHEME, UPSTREAM_URL_ENV};
use pubsub_core::{PubsubError, PubsubResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Publisher configuration
///
/// ```toml
/// topic_url = "fluentd://web?bodykey=log"
/// upstream_url = "tcp://fluentd:24224/app"
/// log_level = "info"
///
/// [attributes]
/// host = "web-1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Topic to publish to, e.g. `fluentd://web`
    pub topic_url: String,

    /// Fluentd connection descriptor, `[tcp|udp]://[host][:port][/tag.prefix]`
    #[serde(default)]
    pub upstream_url: String,

    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metadata attached to every published message
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_topic_url() -> String {
    format!("{}://", SCHEME)
}

/// Parse `k=v,k2=v2` into attributes, skipping malformed pairs
fn parse_attributes(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

impl PublisherConfig {
    /// Load configuration from the file named by `CONFIG_FILE`, or from
    /// environment variables when it is unset
    ///
    /// Priority: TOML file → Environment variables
    pub fn load() -> PubsubResult<Self> {
        let mut config = if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_file(&config_file)?
        } else {
            Self::from_env()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> PubsubResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PubsubError::config(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PubsubError::config(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PUBSUB_TOPIC_URL`: Topic URL (default: `fluentd://`)
    /// - `FLUENTD_UPSTREAM_URL`: Fluentd descriptor (default: tcp://127.0.0.1:24224)
    /// - `LOG_LEVEL`: Log level (default: info)
    /// - `PUBSUB_ATTRIBUTES`: Comma-separated `key=value` metadata
    pub fn from_env() -> Self {
        Self {
            topic_url: env::var("PUBSUB_TOPIC_URL").unwrap_or_else(|_| default_topic_url()),
            upstream_url: env::var(UPSTREAM_URL_ENV).unwrap_or_default(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            attributes: env::var("PUBSUB_ATTRIBUTES")
                .map(|raw| parse_attributes(&raw))
                .unwrap_or_default(),
        }
    }

    /// Apply environment variable overrides on top of file settings
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PUBSUB_TOPIC_URL") {
            self.topic_url = val;
        }
        if let Ok(val) = env::var(UPSTREAM_URL_ENV) {
            self.upstream_url = val;
        }
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.log_level = val;
        }
        if let Ok(val) = env::var("PUBSUB_ATTRIBUTES") {
            self.attributes.extend(parse_attributes(&val));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> PubsubResult<()> {
        if self.topic_url.is_empty() {
            return Err(PubsubError::config("topic_url cannot be empty"));
        }

        let url = url::Url::parse(&self.topic_url)?;
        if url.scheme() != SCHEME {
            return Err(PubsubError::config(format!(
                "topic_url must use the {}:// scheme, got {}://",
                SCHEME,
                url.scheme()
            )));
        }

        if self.log_level.is_empty() {
            return Err(PubsubError::config("log_level cannot be empty"));
        }

        Ok(())
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic_url: default_topic_url(),
            upstream_url: String::new(),
            log_level: default_log_level(),
            attributes: HashMap::new(),
        }
    }
}
