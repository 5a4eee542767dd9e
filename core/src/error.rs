//! Error types for the API client.
//!
//! # Design
//! Every failure keeps its cause in a dedicated variant. Callers that only
//! want the user-facing string use `ApiError::message`, which reports the
//! server's (or the status line's) error for HTTP failures and
//! `"Unknown error"` for everything else.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::HttpResponse;

/// Message reported for failures that are not HTTP status errors.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Errors returned by `ApiClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status outside `200..300`.
    #[error("HTTP {status_code}: {error}")]
    Http {
        status_code: u16,
        /// The body's `"error"` string, or the status text when the body has none.
        error: String,
        /// Fields of the JSON error body; empty when the body is not a JSON object.
        fields: Map<String, Value>,
        response: Box<HttpResponse>,
    },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A successful response carried a body that is not JSON.
    #[error("HTTP {status_code}: response body is not JSON: {source}")]
    Decode {
        status_code: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Forwarding a successful response to the object cache failed.
    #[error("caching response failed: {0}")]
    Cache(#[from] CacheError),

    /// Unclassified failure.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ApiError {
    /// HTTP status code, when the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Http { status_code, .. } | ApiError::Decode { status_code, .. } => {
                Some(*status_code)
            }
            _ => None,
        }
    }

    /// The caller-facing error string.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { error, .. } => error,
            _ => UNKNOWN_ERROR,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Http { status_code: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Http { status_code: 404, .. })
    }
}

/// Failures raised by a `Transport` before a response was available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, TLS, redirect or protocol failure.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be read as text.
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Failures raised while forwarding a response payload to an `ObjectCache`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("response envelope has no `data` field")]
    MissingData,

    #[error("entity has no `id` field")]
    MissingId,

    /// `data` is neither a collection nor an entity.
    #[error("cannot cache `data` of type {0}")]
    UnsupportedShape(&'static str),

    /// The backing store rejected the write.
    #[error("cache store error: {0}")]
    Store(String),
}
