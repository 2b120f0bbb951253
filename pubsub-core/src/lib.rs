//! # PubSub Core
//!
//! Backend-neutral publish/subscribe abstractions.
//!
//! Applications publish through a [`Topic`] handle and never see the backend.
//! Each backend implements [`TopicDriver`], and optionally a
//! [`TopicUrlOpener`] so that topics can be opened from URLs such as
//! `fluentd://orders` through a [`UrlMux`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pubsub_core::{ErrorCode, Message, PubsubError, PubsubResult, Topic, TopicDriver};
//! use async_trait::async_trait;
//!
//! pub struct StdoutDriver;
//!
//! #[async_trait]
//! impl TopicDriver for StdoutDriver {
//!     fn name(&self) -> &'static str {
//!         "stdout"
//!     }
//!
//!     async fn send_batch(&self, messages: &mut [Message]) -> PubsubResult<()> {
//!         for msg in messages.iter() {
//!             println!("{}", msg.body_text());
//!         }
//!         Ok(())
//!     }
//!
//!     fn is_retryable(&self, _err: &PubsubError) -> bool {
//!         false
//!     }
//!
//!     fn error_code(&self, err: Option<&PubsubError>) -> ErrorCode {
//!         err.map_or(ErrorCode::Ok, |_| ErrorCode::Unknown)
//!     }
//!
//!     async fn close(&self) -> PubsubResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> PubsubResult<()> {
//! let topic = Topic::new(StdoutDriver);
//! topic.send(&mut Message::new("hello")).await?;
//! topic.close().await
//! # }
//! ```

mod driver;
mod error;
mod message;
mod metrics;
mod mux;
mod retry;
mod topic;

// Re-export public API
pub use driver::{ErrorCode, TopicDriver};
pub use error::{BoxError, PubsubError, PubsubResult};
pub use message::Message;
pub use metrics::TopicMetrics;
pub use mux::{TopicUrlOpener, UrlMux};
pub use retry::{RetryConfig, RetryStrategy};
pub use topic::Topic;

// Re-exported so openers and callers share one URL type
pub use url::Url;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
