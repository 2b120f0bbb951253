//! Message envelope handed to topics.
//!
//! Drivers receive messages by mutable reference and may rewrite the
//! metadata map while sending; callers observe those changes afterwards.

use std::borrow::Cow;
use std::collections::HashMap;

/// A message published through a [`Topic`](crate::Topic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// The message payload
    pub body: Vec<u8>,
    /// String key/value metadata travelling with the payload
    pub metadata: HashMap<String, String>,
    /// Driver-assigned acknowledgment identifier, used to identify the message in errors
    pub ack_id: Option<String>,
}

impl Message {
    /// Create a new message with a payload and no metadata
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            metadata: HashMap::new(),
            ack_id: None,
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add multiple metadata entries
    pub fn with_metadata_map(mut self, entries: HashMap<String, String>) -> Self {
        self.metadata.extend(entries);
        self
    }

    /// Set the acknowledgment identifier
    pub fn with_ack_id(mut self, ack_id: impl Into<String>) -> Self {
        self.ack_id = Some(ack_id.into());
        self
    }

    /// Get the payload size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Get the payload as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Get a specific metadata value
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder() {
        let msg = Message::new("hello")
            .with_metadata("language", "en")
            .with_metadata("importance", "high")
            .with_ack_id("42");

        assert_eq!(msg.body, b"hello");
        assert_eq!(msg.size(), 5);
        assert_eq!(msg.get_metadata("language"), Some("en"));
        assert_eq!(msg.get_metadata("missing"), None);
        assert_eq!(msg.ack_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_body_text_is_lossy() {
        let msg = Message::new(vec![b'o', b'k', 0xff]);
        assert_eq!(msg.body_text(), "ok\u{fffd}");
    }

    #[test]
    fn test_metadata_map_merges() {
        let mut extra = HashMap::new();
        extra.insert("a".to_string(), "1".to_string());
        extra.insert("b".to_string(), "2".to_string());

        let msg = Message::new("x").with_metadata("a", "0").with_metadata_map(extra);
        assert_eq!(msg.get_metadata("a"), Some("1"));
        assert_eq!(msg.metadata.len(), 2);
    }
}
