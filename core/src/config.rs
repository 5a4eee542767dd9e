//! Client configuration.
//!
//! # Design
//! `ClientConfig` is resolved once when an `ApiClient` is built and never
//! changes afterwards. Values come from three layers, last one wins:
//! the compiled-in defaults, the process environment (`API_BASE_URL`,
//! `API_USER_AGENT`), and per-instance `ClientOptions`. Empty strings count as
//! "not set" in the last two layers.

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_API_USER_AGENT: &str = concat!("api-client/", env!("CARGO_PKG_VERSION"));

pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const API_USER_AGENT_ENV: &str = "API_USER_AGENT";

/// Immutable settings shared by every request of one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_API_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `API_BASE_URL` / `API_USER_AGENT` when set.
    pub fn from_env() -> Self {
        Self::default().with_options(ClientOptions {
            base_url: std::env::var(API_BASE_URL_ENV).ok(),
            user_agent: std::env::var(API_USER_AGENT_ENV).ok(),
        })
    }

    /// Apply per-instance overrides. Missing or empty overrides keep the
    /// current value.
    pub fn with_options(self, options: ClientOptions) -> Self {
        Self {
            base_url: non_empty(options.base_url).unwrap_or(self.base_url),
            user_agent: non_empty(options.user_agent).unwrap_or(self.user_agent),
        }
    }
}

/// Per-instance overrides, layered over the environment by
/// `ApiClient::with_options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientOptions {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
