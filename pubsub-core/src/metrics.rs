//! Send metrics reported through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder.

use metrics::{counter, histogram};
use std::time::Duration;

/// Per-topic metric handles
#[derive(Debug, Clone)]
pub struct TopicMetrics {
    driver: &'static str,
}

impl TopicMetrics {
    pub fn new(driver: &'static str) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &'static str {
        self.driver
    }

    pub fn record_sent(&self, count: usize) {
        counter!("pubsub_messages_sent_total", "driver" => self.driver).increment(count as u64);
    }

    pub fn record_error(&self, code: &str) {
        counter!(
            "pubsub_send_errors_total",
            "driver" => self.driver,
            "code" => code.to_string()
        )
        .increment(1);
    }

    pub fn record_retry(&self) {
        counter!("pubsub_send_retries_total", "driver" => self.driver).increment(1);
    }

    pub fn record_send_duration(&self, duration: Duration) {
        histogram!("pubsub_send_duration_seconds", "driver" => self.driver)
            .record(duration.as_secs_f64());
    }
}
