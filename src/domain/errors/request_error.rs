//! Request error types.

use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

/// Shared, cloneable error cause.
pub type ErrorCause = Arc<dyn StdError + Send + Sync>;

/// Coarse classification of a [`RequestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input caught before any I/O.
    InvalidRequest,
    /// Connectivity failure or timeout.
    Network,
    /// Non-success HTTP status.
    HttpStatus,
    /// Body does not match the expected shape or encoding.
    Parse,
    /// Image payload could not be decoded.
    Decode,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::Network => write!(f, "network"),
            Self::HttpStatus => write!(f, "http status"),
            Self::Parse => write!(f, "parse"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// Terminal failure of a request.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum RequestError {
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },

    #[error("network error: {message}")]
    Network {
        message: String,
        timed_out: bool,
        #[source]
        source: Option<ErrorCause>,
    },

    #[error("server responded with HTTP {status}")]
    HttpStatus { status: u16, body: Bytes },

    #[error("parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },

    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },
}

impl RequestError {
    /// Creates invalid request error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates invalid request error with its cause.
    #[must_use]
    pub fn invalid_with(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            source: Some(Arc::new(cause)),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            timed_out: false,
            source: None,
        }
    }

    /// Creates network error with its cause.
    #[must_use]
    pub fn network_with(
        message: impl Into<String>,
        timed_out: bool,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            timed_out,
            source: Some(Arc::new(cause)),
        }
    }

    /// Creates HTTP status error carrying the raw body.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Creates parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Creates parse error with its cause.
    #[must_use]
    pub fn parse_with(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(Arc::new(cause)),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Creates decode error with its cause.
    #[must_use]
    pub fn decode_with(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(Arc::new(cause)),
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Network { .. } => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Returns the HTTP status code for status errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body for status errors.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns whether the network call timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timed_out: true, .. })
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns whether resubmitting the same request may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
