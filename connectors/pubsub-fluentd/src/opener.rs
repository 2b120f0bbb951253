//! URL openers for `fluentd://` topics.
//!
//! The host of a topic URL is appended to the opener's tag prefix. Two query
//! parameters are understood: `bodykey` and `tagkey`, mapping onto
//! [`TopicOptions`]. Anything else is rejected.

use crate::client::{FluentClient, ForwardClient};
use crate::descriptor::parse_descriptor;
use crate::topic::{open_topic, TopicOptions};
use async_trait::async_trait;
use pubsub_core::{PubsubError, PubsubResult, Topic, TopicUrlOpener, UrlMux};
use std::env;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Scheme the Fluentd openers are registered under
pub const SCHEME: &str = "fluentd";

/// Environment variable holding the default connection descriptor
pub const UPSTREAM_URL_ENV: &str = "FLUENTD_UPSTREAM_URL";

/// Opens Fluentd topics over an existing connection
#[derive(Clone, Default)]
pub struct UrlOpener {
    /// Connection shared by every topic this opener creates
    pub connection: Option<Arc<dyn FluentClient>>,
    /// Prefix of the tags of every topic this opener creates
    pub tag_prefix: String,
}

impl UrlOpener {
    pub fn new(connection: Arc<dyn FluentClient>, tag_prefix: impl Into<String>) -> Self {
        Self {
            connection: Some(connection),
            tag_prefix: tag_prefix.into(),
        }
    }

    /// Read `bodykey`/`tagkey` from the query, rejecting any other parameter
    pub fn topic_options(url: &Url) -> PubsubResult<TopicOptions> {
        let mut options = TopicOptions::default();

        for (param, value) in url.query_pairs() {
            match &*param {
                "bodykey" => {
                    if !value.is_empty() {
                        options.body_key = Some(value.into_owned());
                    }
                }
                "tagkey" => {
                    if !value.is_empty() {
                        options.tag_key = Some(value.into_owned());
                    }
                }
                _ => {
                    return Err(PubsubError::InvalidQueryParameter {
                        url: url.to_string(),
                        param: param.into_owned(),
                    })
                }
            }
        }

        Ok(options)
    }

    /// Tag prefix for a topic URL: the opener prefix and the URL host, dot-joined
    pub fn subject(&self, url: &Url) -> String {
        let host = url.host_str().unwrap_or_default();
        if !self.tag_prefix.is_empty() && !host.is_empty() {
            format!("{}.{}", self.tag_prefix, host)
        } else {
            format!("{}{}", self.tag_prefix, host)
        }
    }

    pub fn open(&self, url: &Url) -> PubsubResult<Topic> {
        let options = Self::topic_options(url)?;
        let subject = self.subject(url);
        debug!(%url, %subject, "Opening Fluentd topic from URL");
        open_topic(self.connection.clone(), subject, options)
    }
}

#[async_trait]
impl TopicUrlOpener for UrlOpener {
    async fn open_topic_url(&self, url: &Url) -> PubsubResult<Topic> {
        self.open(url)
    }
}

impl std::fmt::Debug for UrlOpener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlOpener")
            .field("connected", &self.connection.is_some())
            .field("tag_prefix", &self.tag_prefix)
            .finish()
    }
}

/// Opener that connects using the descriptor found in the environment.
///
/// The variable is read on every open, so each topic gets its own connection.
#[derive(Debug, Clone)]
pub struct DefaultUrlOpener {
    env_var: String,
}

impl DefaultUrlOpener {
    /// Read the descriptor from `FLUENTD_UPSTREAM_URL`
    pub fn new() -> Self {
        Self::with_env_var(UPSTREAM_URL_ENV)
    }

    /// Read the descriptor from a different variable
    pub fn with_env_var(name: impl Into<String>) -> Self {
        Self {
            env_var: name.into(),
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Build a connected [`UrlOpener`] from the current environment
    pub fn dial(&self) -> PubsubResult<UrlOpener> {
        let descriptor = env::var(&self.env_var).unwrap_or_default();
        let (config, tag_prefix) = parse_descriptor(&descriptor)?;
        info!(
            network = %config.network,
            address = %config.address(),
            %tag_prefix,
            "Using Fluentd upstream from {}", self.env_var
        );

        let client: Arc<dyn FluentClient> = Arc::new(ForwardClient::new(config));
        Ok(UrlOpener::new(client, tag_prefix))
    }
}

impl Default for DefaultUrlOpener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicUrlOpener for DefaultUrlOpener {
    async fn open_topic_url(&self, url: &Url) -> PubsubResult<Topic> {
        self.dial()?.open(url)
    }
}

/// Register the environment-driven opener under [`SCHEME`]
pub fn register(mux: &mut UrlMux) -> PubsubResult<()> {
    mux.register_topic(SCHEME, Arc::new(DefaultUrlOpener::new()))
}

/// Register `opener` under [`SCHEME`]
pub fn register_with(mux: &mut UrlMux, opener: UrlOpener) -> PubsubResult<()> {
    mux.register_topic(SCHEME, Arc::new(opener))
}
