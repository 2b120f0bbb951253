//! # PubSub Fluentd
//!
//! Topic driver publishing messages to a Fluentd collector.
//!
//! Each message is posted as one record. The tag is the topic's prefix joined
//! with the message's `tag` metadata entry; the body is stored in the record
//! under `message`. Both key names can be changed through [`TopicOptions`].
//!
//! ## Opening topics by URL
//!
//! ```rust,no_run
//! use pubsub_core::{Message, UrlMux};
//!
//! # async fn run() -> pubsub_core::PubsubResult<()> {
//! // FLUENTD_UPSTREAM_URL=tcp://localhost:24224/first
//! let mut mux = UrlMux::new();
//! pubsub_fluentd::register(&mut mux)?;
//!
//! let topic = mux.open_topic("fluentd://second").await?;
//! let mut msg = Message::new("Hello, World!").with_metadata("tag", "third");
//! topic.send(&mut msg).await?; // posted under "first.second.third"
//! topic.close().await
//! # }
//! ```

pub mod client;
pub mod config;
pub mod descriptor;
pub mod opener;
pub mod topic;

pub use client::{FluentClient, ForwardClient};
pub use config::PublisherConfig;
pub use descriptor::{parse_descriptor, FluentConfig, Network, DEFAULT_HOST, DEFAULT_PORT};
pub use opener::{register, register_with, DefaultUrlOpener, UrlOpener, SCHEME, UPSTREAM_URL_ENV};
pub use topic::{open_topic, FluentdTopic, TopicOptions, DEFAULT_BODY_KEY, DEFAULT_TAG_KEY};
