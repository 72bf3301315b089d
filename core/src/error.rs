//! Error types for the DreamFactory client.
//!
//! # Design
//! Validation failures (`InvalidArgument`, `InvalidAddress`, `InvalidState`)
//! are raised before anything reaches the transport. Everything else is a
//! faithful classification of what came back: `NotFound` for single-record
//! lookups that missed, `Upstream` for any other non-2xx status, and
//! `Transport` for failures below HTTP. An upstream error is never reported
//! as an empty success.

use thiserror::Error;

/// Maximum number of payload bytes kept in a [`ApiError::Serialization`].
pub(crate) const PAYLOAD_PREVIEW_BYTES: usize = 512;

/// Errors returned by every client operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required input was missing or malformed. Detected before any
    /// network call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The configured base endpoint could not be used to build request URLs.
    #[error("invalid address '{uri}': {reason}")]
    InvalidAddress { uri: String, reason: String },

    /// A call that needs an authenticated session was made while anonymous.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The requested record does not exist.
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// A payload could not be encoded, or a response body did not match the
    /// expected shape. `payload` holds a truncated copy of the body.
    #[error("serialization failed: {message}")]
    Serialization { message: String, payload: String },

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered with a non-success status.
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The session manager was asked to make an illegal transition.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl ApiError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ApiError::InvalidArgument(message.into())
    }

    pub(crate) fn serialization(message: impl Into<String>, payload: &[u8]) -> Self {
        ApiError::Serialization {
            message: message.into(),
            payload: preview(payload),
        }
    }

    /// HTTP status carried by the error, if it came from the service.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the transport's deadline.
    #[error("transport timed out")]
    Timeout,

    /// The request was cancelled before completion.
    #[error("transport request cancelled")]
    Cancelled,

    /// Connection-level failure (DNS, refused, TLS, reset).
    #[error("transport connection failed: {0}")]
    Connection(String),
}

/// Lossy UTF-8 rendering of `bytes`, cut to [`PAYLOAD_PREVIEW_BYTES`] on a
/// character boundary.
pub(crate) fn preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= PAYLOAD_PREVIEW_BYTES {
        return text.into_owned();
    }
    let mut end = PAYLOAD_PREVIEW_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
