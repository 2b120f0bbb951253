//! Fluentd topic driver.
//!
//! Each message becomes one Fluentd record. The record is the message
//! metadata plus the body stored under the body key; the tag is the topic's
//! tag prefix joined with an optional per-message tag taken from metadata.

use crate::client::FluentClient;
use async_trait::async_trait;
use pubsub_core::{ErrorCode, Message, PubsubError, PubsubResult, Topic, TopicDriver};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_BODY_KEY: &str = "message";
pub const DEFAULT_TAG_KEY: &str = "tag";

/// Options for a Fluentd topic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicOptions {
    /// Record key holding the message body (default: "message")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_key: Option<String>,

    /// Metadata key carrying an additional tag suffix (default: "tag")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
}

impl TopicOptions {
    pub fn with_body_key(mut self, key: impl Into<String>) -> Self {
        self.body_key = Some(key.into());
        self
    }

    pub fn with_tag_key(mut self, key: impl Into<String>) -> Self {
        self.tag_key = Some(key.into());
        self
    }
}

fn key_or_default(key: Option<String>, default: &str) -> String {
    key.filter(|k| !k.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Topic driver posting messages to Fluentd
pub struct FluentdTopic {
    client: Arc<dyn FluentClient>,
    tag_prefix: String,
    body_key: String,
    tag_key: String,
}

impl FluentdTopic {
    /// Create a driver; fails when no client is given
    pub fn new(
        client: Option<Arc<dyn FluentClient>>,
        tag_prefix: impl Into<String>,
        options: TopicOptions,
    ) -> PubsubResult<Self> {
        let client = client.ok_or_else(|| {
            PubsubError::invalid_argument("pubsub-fluentd: a Fluentd client is required")
        })?;

        Ok(Self {
            client,
            tag_prefix: tag_prefix.into(),
            body_key: key_or_default(options.body_key, DEFAULT_BODY_KEY),
            tag_key: key_or_default(options.tag_key, DEFAULT_TAG_KEY),
        })
    }

    /// The client records are posted to
    pub fn client(&self) -> &Arc<dyn FluentClient> {
        &self.client
    }

    pub fn tag_prefix(&self) -> &str {
        &self.tag_prefix
    }

    pub fn body_key(&self) -> &str {
        &self.body_key
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    /// Resolve the tag for `message`, consuming its tag metadata entry.
    ///
    /// With a prefix the entry is appended after a dot; without one it is
    /// used alone. A message without the entry gets the bare prefix.
    fn full_tag(&self, message: &mut Message) -> PubsubResult<String> {
        let full_tag = match message.metadata.remove(&self.tag_key) {
            Some(tag) if !self.tag_prefix.is_empty() => format!("{}.{}", self.tag_prefix, tag),
            Some(tag) => tag,
            None => self.tag_prefix.clone(),
        };

        if full_tag.is_empty() {
            return Err(PubsubError::MissingTag {
                ack_id: message.ack_id.clone(),
            });
        }
        Ok(full_tag)
    }
}

#[async_trait]
impl TopicDriver for FluentdTopic {
    fn name(&self) -> &'static str {
        "fluentd"
    }

    async fn send_batch(&self, messages: &mut [Message]) -> PubsubResult<()> {
        for message in messages.iter_mut() {
            let tag = self.full_tag(message)?;

            let body = message.body_text().into_owned();
            message.metadata.insert(self.body_key.clone(), body);

            self.client.post(&tag, &message.metadata).await?;
            debug!(%tag, fields = message.metadata.len(), "Sent message to Fluentd");
        }
        Ok(())
    }

    fn is_retryable(&self, _err: &PubsubError) -> bool {
        false
    }

    fn as_capability(&self) -> Option<&dyn Any> {
        Some(&self.client)
    }

    fn error_code(&self, err: Option<&PubsubError>) -> ErrorCode {
        match err {
            None => ErrorCode::Ok,
            Some(PubsubError::Canceled) => ErrorCode::Canceled,
            Some(_) => ErrorCode::Unknown,
        }
    }

    async fn close(&self) -> PubsubResult<()> {
        info!(tag_prefix = %self.tag_prefix, "Closing Fluentd topic");
        self.client.close().await
    }
}

/// Open a [`Topic`] publishing to Fluentd.
///
/// `tag_prefix` scopes every record sent through the topic; see
/// [`FluentdTopic`] for how per-message tags are joined to it.
pub fn open_topic(
    client: Option<Arc<dyn FluentClient>>,
    tag_prefix: impl Into<String>,
    options: TopicOptions,
) -> PubsubResult<Topic> {
    let driver = FluentdTopic::new(client, tag_prefix, options)?;
    info!(
        tag_prefix = %driver.tag_prefix,
        body_key = %driver.body_key,
        tag_key = %driver.tag_key,
        "Opened Fluentd topic"
    );
    Ok(Topic::new(driver))
}
