//! Caller-facing topic handle.
//!
//! A [`Topic`] wraps a [`TopicDriver`] and adds the behaviour that is the
//! same for every backend: closed-state tracking, retries of errors the
//! driver marks as retryable, cancellation and metrics.

use crate::{
    ErrorCode, Message, PubsubError, PubsubResult, RetryConfig, RetryStrategy, TopicDriver,
    TopicMetrics,
};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A handle for publishing messages to one destination
pub struct Topic {
    driver: Box<dyn TopicDriver>,
    retry_strategy: RetryStrategy,
    metrics: TopicMetrics,
    closed: AtomicBool,
}

impl Topic {
    /// Wrap a driver with the default retry policy
    pub fn new<D: TopicDriver + 'static>(driver: D) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    pub fn from_boxed(driver: Box<dyn TopicDriver>) -> Self {
        let metrics = TopicMetrics::new(driver.name());
        Self {
            driver,
            retry_strategy: RetryStrategy::new(RetryConfig::default()),
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_strategy = RetryStrategy::new(config);
        self
    }

    /// Name of the driver behind this topic
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a single message
    pub async fn send(&self, message: &mut Message) -> PubsubResult<()> {
        self.send_batch(std::slice::from_mut(message)).await
    }

    /// Send a single message, giving up with [`PubsubError::Canceled`] once `token` fires
    pub async fn send_with_cancel(
        &self,
        message: &mut Message,
        token: &CancellationToken,
    ) -> PubsubResult<()> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.metrics.record_error(&ErrorCode::Canceled.to_string());
                Err(PubsubError::Canceled)
            }
            result = self.send(message) => result,
        }
    }

    /// Send messages in order.
    ///
    /// The first failure is returned; messages before it have already been
    /// delivered to the driver.
    pub async fn send_batch(&self, messages: &mut [Message]) -> PubsubResult<()> {
        if self.is_closed() {
            return Err(PubsubError::Closed);
        }
        if messages.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.driver.send_batch(messages).await {
                Ok(()) => {
                    self.metrics.record_sent(messages.len());
                    self.metrics.record_send_duration(start.elapsed());
                    return Ok(());
                }
                Err(e)
                    if self.driver.is_retryable(&e) && self.retry_strategy.should_retry(attempt) =>
                {
                    attempt += 1;
                    self.metrics.record_retry();

                    let backoff = self.retry_strategy.calculate_backoff(attempt);
                    warn!(
                        driver = self.driver.name(),
                        "Retry attempt {} after {:?} - error: {}", attempt, backoff, e
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    let code = self.driver.error_code(Some(&e));
                    self.metrics.record_error(&code.to_string());
                    debug!(driver = self.driver.name(), %code, "Send failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Access the driver's underlying client as `T`.
    ///
    /// Returns `None` when the driver exposes nothing or exposes a different type.
    pub fn capability<T: Any>(&self) -> Option<&T> {
        self.driver.as_capability()?.downcast_ref::<T>()
    }

    /// Classify an error returned by this topic
    pub fn error_code(&self, err: &PubsubError) -> ErrorCode {
        self.driver.error_code(Some(err))
    }

    /// Extract a driver-specific error value
    pub fn error_as<'a>(&self, err: &'a PubsubError) -> Option<&'a dyn Any> {
        self.driver.error_as(err)
    }

    /// Close the topic and its driver.
    ///
    /// Only the first call reaches the driver; later calls return [`PubsubError::Closed`].
    pub async fn close(&self) -> PubsubResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(PubsubError::Closed);
        }
        info!(driver = self.driver.name(), "Closing topic");
        self.driver.close().await
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("driver", &self.driver.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Driver that fails a configurable number of sends before succeeding
    struct FlakyDriver {
        failures_left: AtomicUsize,
        retryable: bool,
        attempts: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        handle: String,
    }

    impl FlakyDriver {
        fn new(failures: usize, retryable: bool) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                retryable,
                attempts: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
                sent: Arc::new(Mutex::new(Vec::new())),
                handle: "client-handle".to_string(),
            }
        }
    }

    #[async_trait]
    impl TopicDriver for FlakyDriver {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn send_batch(&self, messages: &mut [Message]) -> PubsubResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(PubsubError::transport("temporarily unavailable"));
            }
            let mut sent = self.sent.lock().unwrap();
            for msg in messages.iter_mut() {
                msg.metadata.insert("seen".to_string(), "yes".to_string());
                sent.push(msg.body.clone());
            }
            Ok(())
        }

        fn is_retryable(&self, err: &PubsubError) -> bool {
            self.retryable && err.is_transport()
        }

        fn as_capability(&self) -> Option<&dyn Any> {
            Some(&self.handle)
        }

        fn error_code(&self, err: Option<&PubsubError>) -> ErrorCode {
            match err {
                None => ErrorCode::Ok,
                Some(PubsubError::Canceled) => ErrorCode::Canceled,
                Some(_) => ErrorCode::Unknown,
            }
        }

        async fn close(&self) -> PubsubResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Driver whose sends never complete
    struct StuckDriver;

    #[async_trait]
    impl TopicDriver for StuckDriver {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn send_batch(&self, _messages: &mut [Message]) -> PubsubResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn is_retryable(&self, _err: &PubsubError) -> bool {
            false
        }

        fn error_code(&self, err: Option<&PubsubError>) -> ErrorCode {
            match err {
                None => ErrorCode::Ok,
                Some(PubsubError::Canceled) => ErrorCode::Canceled,
                Some(_) => ErrorCode::Unknown,
            }
        }

        async fn close(&self) -> PubsubResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_mutates_caller_message() {
        let driver = FlakyDriver::new(0, false);
        let sent = driver.sent.clone();
        let topic = Topic::new(driver);

        let mut msg = Message::new("hello");
        topic.send(&mut msg).await.unwrap();

        assert_eq!(msg.get_metadata("seen"), Some("yes"));
        assert_eq!(sent.lock().unwrap().as_slice(), &[b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn test_retryable_errors_are_retried() {
        let driver = FlakyDriver::new(2, true);
        let attempts = driver.attempts.clone();
        let topic = Topic::new(driver).with_retry(RetryConfig::new(3, 1, 2));

        let mut msg = Message::new("retry me");
        topic.send(&mut msg).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_resends_whole_batch() {
        let driver = FlakyDriver::new(1, true);
        let attempts = driver.attempts.clone();
        let sent = driver.sent.clone();
        let topic = Topic::new(driver).with_retry(RetryConfig::new(3, 1, 2));

        let mut batch = vec![Message::new("a"), Message::new("b")];
        topic.send_batch(&mut batch).await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            &[b"a".to_vec(), b"b".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_immediately() {
        let driver = FlakyDriver::new(1, false);
        let attempts = driver.attempts.clone();
        let topic = Topic::new(driver).with_retry(RetryConfig::new(3, 1, 2));

        let mut msg = Message::new("once");
        let err = topic.send(&mut msg).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(topic.error_code(&err), ErrorCode::Unknown);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let driver = FlakyDriver::new(10, true);
        let attempts = driver.attempts.clone();
        let topic = Topic::new(driver).with_retry(RetryConfig::new(2, 1, 1));

        let mut msg = Message::new("never");
        assert!(topic.send(&mut msg).await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_driver() {
        let driver = FlakyDriver::new(0, false);
        let attempts = driver.attempts.clone();
        let topic = Topic::new(driver);

        topic.send_batch(&mut []).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_once() {
        let driver = FlakyDriver::new(0, false);
        let closes = driver.closes.clone();
        let topic = Topic::new(driver);

        topic.close().await.unwrap();
        assert!(topic.is_closed());
        assert!(matches!(topic.close().await, Err(PubsubError::Closed)));
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let mut msg = Message::new("late");
        assert!(matches!(
            topic.send(&mut msg).await,
            Err(PubsubError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_capability_is_type_checked() {
        let topic = Topic::new(FlakyDriver::new(0, false));

        assert_eq!(
            topic.capability::<String>().map(String::as_str),
            Some("client-handle")
        );
        assert!(topic.capability::<u64>().is_none());
        assert!(Topic::new(StuckDriver).capability::<String>().is_none());
    }

    #[tokio::test]
    async fn test_send_with_cancel() {
        let topic = Topic::new(StuckDriver);
        let token = CancellationToken::new();
        token.cancel();

        let mut msg = Message::new("stuck");
        let err = topic.send_with_cancel(&mut msg, &token).await.unwrap_err();
        assert!(matches!(err, PubsubError::Canceled));
        assert_eq!(topic.error_code(&err), ErrorCode::Canceled);
    }
}
