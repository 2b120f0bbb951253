//! The contract every topic backend implements.

use crate::{Message, PubsubError, PubsubResult};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;

/// Portable classification of driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error
    Ok,
    /// The error could not be classified
    Unknown,
    /// A resource was not found
    NotFound,
    /// A caller-supplied argument was invalid
    InvalidArgument,
    /// The operation was canceled
    Canceled,
    /// The backend refused the operation
    FailedPrecondition,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Ok => "OK",
            ErrorCode::Unknown => "Unknown",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::Canceled => "Canceled",
            ErrorCode::FailedPrecondition => "FailedPrecondition",
        };
        f.write_str(name)
    }
}

/// Backend-specific implementation behind a [`Topic`](crate::Topic).
///
/// Implementations must be usable from several tasks at once; the handle
/// adds no locking of its own around `send_batch`.
#[async_trait]
pub trait TopicDriver: Send + Sync {
    /// Short driver name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Send messages in order, stopping at the first failure.
    ///
    /// Messages before the failing one stay sent.
    async fn send_batch(&self, messages: &mut [Message]) -> PubsubResult<()>;

    /// Whether a failed `send_batch` may be retried by the handle.
    ///
    /// A retry resends the whole slice, including messages already delivered
    /// and messages the driver has already rewritten. Drivers that mutate
    /// messages or deliver them one at a time must return `false`.
    fn is_retryable(&self, err: &PubsubError) -> bool;

    /// Expose the driver's underlying client, if it has one.
    ///
    /// Callers downcast the returned value through [`Topic::capability`](crate::Topic::capability).
    fn as_capability(&self) -> Option<&dyn Any> {
        None
    }

    /// Extract a driver-specific error value from `err`
    fn error_as<'a>(&self, _err: &'a PubsubError) -> Option<&'a dyn Any> {
        None
    }

    /// Classify an error; `None` means success
    fn error_code(&self, err: Option<&PubsubError>) -> ErrorCode;

    /// Release the driver's resources
    async fn close(&self) -> PubsubResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Ok.to_string(), "OK");
        assert_eq!(ErrorCode::Canceled.to_string(), "Canceled");
        assert_eq!(ErrorCode::Unknown.to_string(), "Unknown");
    }
}
