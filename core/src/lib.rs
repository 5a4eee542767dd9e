//! Client core for a JSON API consumed by a web frontend.
//!
//! # Overview
//! `ApiClient` builds requests (default headers, bearer token, query string
//! or JSON body), executes them through a pluggable `Transport`, and turns
//! responses into the decoded JSON envelope or a structured `ApiError`.
//! Successful payloads can optionally be forwarded to an `ObjectCache`.
//!
//! # Design
//! - The client is stateless apart from its immutable `ClientConfig`; the
//!   session store, object cache and transport are injected as trait objects.
//! - `build_request` / `parse_response` are pure halves around the single
//!   I/O call, so hosts may execute requests themselves.
//! - A 401 response logs the session out before the error is returned.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod session;
pub mod transport;
pub mod types;

pub use cache::{MemoryCache, ObjectCache};
pub use client::ApiClient;
pub use config::{ClientConfig, ClientOptions};
pub use error::{ApiError, CacheError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::construct_query_string;
pub use session::{MemorySession, SessionStore};
pub use transport::{Transport, UreqTransport};
pub use types::{Payload, RequestOptions};
