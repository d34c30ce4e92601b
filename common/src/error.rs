//! Typed outcomes for the transport operations.

use std::io;

use thiserror::Error;

/// Why an `open` attempt did not produce a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenError {
    /// No endpoint exists under this name. Callers should stop retrying.
    #[error("endpoint not found")]
    EndpointNotFound,

    /// The location the endpoint would live in does not exist.
    #[error("endpoint path not found")]
    PathNotFound,

    /// The endpoint exists but did not accept a connection within the wait budget.
    #[error("endpoint busy")]
    Busy,

    /// Endpoint name is empty or cannot be passed to the OS.
    #[error("invalid endpoint name: {0:?}")]
    InvalidEndpoint(String),

    /// Any other OS error, with the raw platform code.
    #[error("os error {0}")]
    Other(i32),
}

impl OpenError {
    /// Not-found errors are final for this endpoint; busy and other errors may clear up.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OpenError::EndpointNotFound | OpenError::PathNotFound)
    }

    /// Whether the endpoint exists but refused us for now.
    pub fn is_busy(&self) -> bool {
        matches!(self, OpenError::Busy)
    }

    /// Raw OS code, only carried by [`OpenError::Other`].
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            OpenError::Other(code) => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn from_io(err: &io::Error) -> Self {
        OpenError::Other(err.raw_os_error().unwrap_or(-1))
    }
}

/// Failure of a non-blocking frame read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Querying the channel failed or the peer has gone away.
    #[error("broken pipe: {0}")]
    BrokenPipe(#[source] io::Error),

    /// Bytes were reported available but the read itself failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// No open channel to read from.
    #[error("not connected")]
    NotConnected,
}

/// Failure of a frame write.
#[derive(Debug, Error)]
pub enum WriteError {
    /// No open channel to write to.
    #[error("not connected")]
    NotConnected,

    /// The OS accepted fewer bytes than requested. The remainder was not sent.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The write call itself failed.
    #[error("write failed: {0}")]
    Failed(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_classification() {
        assert!(OpenError::EndpointNotFound.is_not_found());
        assert!(OpenError::PathNotFound.is_not_found());
        assert!(!OpenError::Busy.is_not_found());
        assert!(OpenError::Busy.is_busy());
        assert_eq!(OpenError::Other(5).raw_os_error(), Some(5));
        assert_eq!(OpenError::Busy.raw_os_error(), None);
    }

    #[test]
    fn test_error_messages() {
        let short = WriteError::ShortWrite {
            written:  2,
            expected: 3,
        };
        assert_eq!(short.to_string(), "short write: 2 of 3 bytes");
        assert_eq!(OpenError::Other(231).to_string(), "os error 231");
    }
}
