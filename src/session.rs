//! Credentials passed explicitly into every backend call.

use secrecy::{ExposeSecret, SecretString};

/// Bearer-token context for one browser-equivalent session.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<SecretString>,
}

impl Credentials {
    /// Credentials without a token. Only unauthenticated endpoints work.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Credentials carrying a bearer token. Blank tokens count as absent.
    pub fn bearer(token: impl Into<String>) -> Self {
        let token: String = token.into();
        if token.trim().is_empty() {
            return Self::anonymous();
        }
        Self {
            token: Some(SecretString::from(token)),
        }
    }

    /// Read the token from `PARASARA_TOKEN`.
    pub fn from_env() -> Self {
        std::env::var("PARASARA_TOKEN")
            .map(Self::bearer)
            .unwrap_or_default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// `Authorization` header value, if a token is present.
    pub fn authorization(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
