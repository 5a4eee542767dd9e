//! JSON API client with session-aware auth and response caching.
//!
//! # Design
//! `ApiClient` holds an immutable `ClientConfig` plus handles to its three
//! collaborators. Every call is split into `build_request`, which produces an
//! `HttpRequest` and reads the session token exactly once, and
//! `parse_response`, which consumes the `HttpResponse`. `fetch` glues the two
//! together around `Transport::execute`; a host that does its own I/O can
//! call the halves directly.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::cache::{cache_payload, ObjectCache};
use crate::config::{ClientConfig, ClientOptions};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::construct_query_string;
use crate::session::SessionStore;
use crate::transport::Transport;
use crate::types::{Payload, RequestOptions};

const JSON: &str = "application/json";

/// Client for a JSON API whose responses are `{"data": ...}` envelopes.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    cache: Arc<dyn ObjectCache>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        cache: Arc<dyn ObjectCache>,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            cache,
        }
    }

    /// Configuration from the environment, overridden by `options`.
    pub fn with_options(
        options: ClientOptions,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionStore>,
        cache: Arc<dyn ObjectCache>,
    ) -> Self {
        let config = ClientConfig::from_env().with_options(options);
        Self::new(config, transport, session, cache)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get(
        &self,
        path: &str,
        data: &Value,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.fetch(path, HttpMethod::Get, data, options).await
    }

    pub async fn post(
        &self,
        path: &str,
        data: &Value,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.fetch(path, HttpMethod::Post, data, options).await
    }

    pub async fn put(
        &self,
        path: &str,
        data: &Value,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        self.fetch(path, HttpMethod::Put, data, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.fetch(path, HttpMethod::Delete, &Value::Null, options).await
    }

    /// Issue one request and return the decoded envelope.
    ///
    /// A 401 logs the session out before the error is returned. With
    /// `options.cache`, the envelope's `data` is forwarded to the object cache
    /// and a caching failure fails the call.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn fetch(
        &self,
        path: &str,
        method: HttpMethod,
        data: &Value,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(path, method, data)?;
        debug!(url = %request.url, "sending request");

        let response = self
            .transport
            .execute(request)
            .await
            .inspect_err(|e| warn!(error = %e, "request failed"))?;
        debug!(status = response.status, "received response");

        self.parse_response(response, options)
    }

    /// Build the `HttpRequest` for `fetch` without executing it.
    ///
    /// GET encodes `data` into the query string; POST and PUT send it as the
    /// JSON body (`null` sends no body); DELETE ignores it.
    pub fn build_request(
        &self,
        path: &str,
        method: HttpMethod,
        data: &Value,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self.url_for(path);
        let mut body = None;

        if method == HttpMethod::Get {
            let query = construct_query_string(data);
            if !query.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&query);
            }
        } else if method.has_body() && !data.is_null() {
            body = Some(serde_json::to_string(data).map_err(ApiError::Serialization)?);
        }

        let mut headers = vec![
            ("Accept".to_string(), JSON.to_string()),
            ("Content-Type".to_string(), JSON.to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
        ];
        if self.session.is_authenticated() {
            if let Some(token) = self.session.token() {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Turn a response into the decoded envelope or an `ApiError`.
    pub fn parse_response(
        &self,
        response: HttpResponse,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        if !response.is_success() {
            if response.status == 401 {
                warn!("unauthorized response, logging out");
                self.session.logout();
            }
            let err = http_error(response);
            warn!(status = err.status_code(), error = err.message(), "request rejected");
            return Err(err);
        }

        let envelope = decode_body(&response)?;
        if options.cache {
            cache_payload(self.cache.as_ref(), Payload::from_envelope(&envelope)?)?;
        }
        Ok(envelope)
    }

    /// Forward a `data` value to the object cache: arrays through
    /// `cache_many`, objects with an `id` through `cache_one`.
    pub fn cache_response(&self, data: &Value) -> Result<(), ApiError> {
        cache_payload(self.cache.as_ref(), Payload::classify(data)?)?;
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Decode a 2xx body. `204 No Content` and blank bodies decode to `null`.
fn decode_body(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.status == 204 || response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|source| ApiError::Decode {
        status_code: response.status,
        source,
    })
}

/// Map a non-2xx response to `ApiError::Http`, keeping the fields of a JSON
/// error body and falling back to the status text otherwise.
fn http_error(response: HttpResponse) -> ApiError {
    let fields = match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    let error = fields
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| response.status_text.clone());

    ApiError::Http {
        status_code: response.status,
        error,
        fields,
        response: Box::new(response),
    }
}
