use std::io::ErrorKind;
use thiserror::Error;

/// Result type for receiver operations
pub type Result<T> = std::result::Result<T, DenonError>;

/// Errors that can occur when talking to a Denon receiver
#[derive(Error, Debug)]
pub enum DenonError {
    /// Socket error (connect, read or write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection was closed while a reply was expected
    #[error("Connection closed")]
    ConnectionClosed,

    /// No reply arrived within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command name is not part of the command table
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Event channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl DenonError {
    /// Host-facing error code, in the style of socket error codes.
    pub fn code(&self) -> &'static str {
        match self {
            DenonError::Timeout => "ETIMEDOUT",
            DenonError::ConnectionClosed => "ECONNCLOSED",
            DenonError::Io(e) => io_code(e.kind()),
            _ => "EINVAL",
        }
    }

    /// Whether this error is the timeout raised by an aggregate poll.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DenonError::Timeout)
            || matches!(self, DenonError::Io(e) if e.kind() == ErrorKind::TimedOut)
    }
}

pub(crate) fn io_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ConnectionRefused => "ECONNREFUSED",
        ErrorKind::ConnectionReset => "ECONNRESET",
        ErrorKind::ConnectionAborted => "ECONNABORTED",
        ErrorKind::NotConnected => "ENOTCONN",
        ErrorKind::BrokenPipe => "EPIPE",
        ErrorKind::TimedOut => "ETIMEDOUT",
        ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        _ => "EIO",
    }
}
