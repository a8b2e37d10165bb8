//! Unified error types for courier.
//!
//! Defines [`CourierError`], the crate-wide error enum built with
//! `thiserror`. Transport failures are carried as opaque sources rather
//! than reinterpreted; the one classification the crate does make is
//! [`CourierError::is_cancelled`], so callers and error interceptors can
//! distinguish an explicitly cancelled request from a genuine failure.

use crate::registry::RequestToken;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CourierError {
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{scheme}' (expected http or https)")]
    UnsupportedScheme { scheme: String },

    #[error("Failed to build HTTP request: {source}")]
    RequestBuild {
        #[source]
        source: http::Error,
    },

    #[error("Failed to encode JSON body: {source}")]
    BodyEncode {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode form body: {source}")]
    FormEncode {
        #[source]
        source: serde_urlencoded::ser::Error,
    },

    #[error("HTTP request failed: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request {token} was cancelled")]
    Cancelled { token: RequestToken },

    #[error("Request task failed: {reason}")]
    TaskFailed { reason: String },
}

impl CourierError {
    /// Whether this error is the result of an explicit cancellation
    /// rather than a transport or encoding failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
