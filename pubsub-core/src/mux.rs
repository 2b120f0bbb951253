//! Scheme-based dispatch of topic URLs to registered openers.
//!
//! Drivers are registered explicitly at process start:
//!
//! ```rust,ignore
//! let mut mux = UrlMux::new();
//! mux.register_topic("fluentd", Arc::new(DefaultUrlOpener::new()))?;
//! let topic = mux.open_topic("fluentd://orders").await?;
//! ```

use crate::{PubsubError, PubsubResult, Topic};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Opens topics for URLs of one scheme
#[async_trait]
pub trait TopicUrlOpener: Send + Sync {
    async fn open_topic_url(&self, url: &Url) -> PubsubResult<Topic>;
}

/// Registry mapping URL schemes to topic openers
#[derive(Default, Clone)]
pub struct UrlMux {
    topic_openers: HashMap<String, Arc<dyn TopicUrlOpener>>,
}

impl UrlMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `opener` for `scheme`; a scheme can only be registered once
    pub fn register_topic(
        &mut self,
        scheme: impl Into<String>,
        opener: Arc<dyn TopicUrlOpener>,
    ) -> PubsubResult<()> {
        let scheme = scheme.into().to_ascii_lowercase();
        if scheme.is_empty() {
            return Err(PubsubError::config("scheme cannot be empty"));
        }
        if self.topic_openers.contains_key(&scheme) {
            return Err(PubsubError::config(format!(
                "scheme {:?} already registered",
                scheme
            )));
        }
        debug!(%scheme, "Registered topic opener");
        self.topic_openers.insert(scheme, opener);
        Ok(())
    }

    /// Whether an opener is registered for `scheme`
    pub fn valid_topic_scheme(&self, scheme: &str) -> bool {
        self.topic_openers
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted
    pub fn topic_schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.topic_openers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Parse `url` and open a topic with the opener registered for its scheme
    pub async fn open_topic(&self, url: &str) -> PubsubResult<Topic> {
        let parsed = Url::parse(url)?;
        self.open_topic_url(&parsed).await
    }

    pub async fn open_topic_url(&self, url: &Url) -> PubsubResult<Topic> {
        let opener = self
            .topic_openers
            .get(url.scheme())
            .ok_or_else(|| PubsubError::UnknownScheme(url.scheme().to_string()))?;
        opener.open_topic_url(url).await
    }
}

impl std::fmt::Debug for UrlMux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlMux")
            .field("topic_schemes", &self.topic_schemes())
            .finish()
    }
}
