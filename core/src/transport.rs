//! The I/O seam of the client.
//!
//! # Design
//! `ApiClient` never talks to the network itself; it hands a plain-data
//! `HttpRequest` to a `Transport` and gets a plain-data `HttpResponse` back.
//! Non-2xx statuses are responses, not errors: only failures that leave no
//! response at all are reported as `Err`.
//!
//! `UreqTransport` is the stock implementation. ureq is blocking, so each
//! request runs on tokio's blocking pool.

use async_trait::async_trait;
use ureq::config::RedirectAuthHeaders;

use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes HTTP requests, following redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Transport` backed by a ureq agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    /// Agent that returns 4xx/5xx as data, follows up to 10 redirects and
    /// uses the proxy configured in the environment, if any.
    pub fn new() -> Self {
        Self::with_proxy(ureq::Proxy::try_from_env())
    }

    /// Same agent settings as `new`, with an explicit proxy (`None` for a
    /// direct connection).
    ///
    /// `Authorization` survives redirects that stay on the same host, the way
    /// a browser keeps it on same-origin redirects. ureq strips it on every
    /// hop by default, which would turn an authenticated call into a 401 and
    /// log the session out.
    pub fn with_proxy(proxy: Option<ureq::Proxy>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(10)
            .redirect_auth_headers(RedirectAuthHeaders::SameHost)
            .proxy(proxy)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent. It must have `http_status_as_error`
    /// disabled, otherwise error statuses surface as transport failures, and
    /// should set `redirect_auth_headers` to `SameHost`, otherwise redirected
    /// authenticated calls arrive without their bearer token.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request))
            .await
            .map_err(|e| ApiError::Unknown(e.to_string()))?
            .map_err(ApiError::from)
    }
}

fn execute_blocking(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, TransportError> {
    let result = match (req.method, req.body) {
        (HttpMethod::Get, _) => with_headers(agent.get(&req.url), &req.headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(&req.url), &req.headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(&req.url), &req.headers).send(body.as_bytes())
        }
        (HttpMethod::Post, None) => with_headers(agent.post(&req.url), &req.headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(&req.url), &req.headers).send(body.as_bytes())
        }
        (HttpMethod::Put, None) => with_headers(agent.put(&req.url), &req.headers).send_empty(),
    };
    let mut response = result.map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TransportError::Body(e.to_string()))?;

    Ok(HttpResponse {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
