//! Authentication state consulted when building requests.

use std::sync::RwLock;

/// Source of the bearer token and owner of the logout action.
pub trait SessionStore: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// The bearer token, if any. Only read when `is_authenticated` is true.
    fn token(&self) -> Option<String>;

    /// Invalidate the session. Called by the client when the server answers 401.
    fn logout(&self);
}

/// In-process session: authenticated exactly while a token is stored.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.login(token);
        session
    }

    pub fn login(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }
}

impl SessionStore for MemorySession {
    fn is_authenticated(&self) -> bool {
        self.token.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn logout(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
