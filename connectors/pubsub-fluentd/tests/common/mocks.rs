//! In-memory Fluentd client for driving topics without a collector

use async_trait::async_trait;
use pubsub_core::{PubsubError, PubsubResult};
use pubsub_fluentd::FluentClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A record as seen by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted {
    pub tag: String,
    pub record: HashMap<String, String>,
}

/// Client recording every post, optionally failing the post at a given index
#[derive(Default)]
pub struct RecordingClient {
    posted: Mutex<Vec<Posted>>,
    attempts: AtomicUsize,
    closes: AtomicUsize,
    fail_at: Option<usize>,
    fail_close: bool,
}

#[allow(dead_code)]
impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the post with zero-based index `index`
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.posted().into_iter().map(|p| p.tag).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FluentClient for RecordingClient {
    async fn post(&self, tag: &str, record: &HashMap<String, String>) -> PubsubResult<()> {
        let index = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(index) {
            return Err(PubsubError::transport_with_source(
                "Failed to post record",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"),
            ));
        }
        self.posted.lock().unwrap().push(Posted {
            tag: tag.to_string(),
            record: record.clone(),
        });
        Ok(())
    }

    async fn close(&self) -> PubsubResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(PubsubError::transport("close failed"));
        }
        Ok(())
    }
}
