//! Error types shared by topics, drivers and openers.

use thiserror::Error;

/// Result type used throughout the publish/subscribe crates
pub type PubsubResult<T> = Result<T, PubsubError>;

/// Boxed source error carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while opening topics or sending messages
#[derive(Debug, Error)]
pub enum PubsubError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required argument was missing or invalid at construction time
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A connection descriptor used a scheme the driver cannot speak
    #[error("Unsupported scheme {scheme:?}, expected one of: {expected}")]
    UnsupportedScheme { scheme: String, expected: String },

    /// A URL could not be parsed
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// A topic URL carried a query parameter the opener does not understand
    #[error("open topic {url}: invalid query parameter {param:?}")]
    InvalidQueryParameter { url: String, param: String },

    /// No opener is registered for the URL scheme
    #[error("No topic opener registered for scheme {0:?}")]
    UnknownScheme(String),

    /// A message could not be resolved to a routing tag
    #[error("Message {} doesn't have tag", .ack_id.as_deref().unwrap_or("<none>"))]
    MissingTag { ack_id: Option<String> },

    /// The underlying transport failed
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Raw I/O failure from a transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The topic has already been closed
    #[error("Topic is closed")]
    Closed,

    /// The operation was canceled by the caller
    #[error("Operation canceled")]
    Canceled,
}

impl PubsubError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a transport error without an underlying cause
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping its cause
    pub fn transport_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error was raised while validating configuration or URLs
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnsupportedScheme { .. }
                | Self::UrlParse(_)
                | Self::InvalidQueryParameter { .. }
                | Self::UnknownScheme(_)
        )
    }

    /// Whether this error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Io(_))
    }
}
