//! Static API key / bearer token authentication.

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use super::Authenticator;
use crate::auth::AuthError;

/// Constant credential sent as `"<prefix> <key>"`. Never refreshes.
#[derive(Clone)]
pub struct StaticAuth {
    header: String,
    prefix: String,
    key: SecretString,
}

impl StaticAuth {
    /// Any prefix; an empty prefix sends the bare key.
    pub fn new(prefix: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            header: "Authorization".into(),
            prefix: prefix.into(),
            key: SecretString::from(key.into()),
        }
    }

    /// `Authorization: ApiKey <key>`
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::new("ApiKey", key)
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new("Bearer", token)
    }

    /// Send in a vendor-specific header instead of `Authorization`.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    fn value(&self) -> String {
        let key = self.key.expose_secret();
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{} {}", self.prefix, key)
        }
    }
}

impl fmt::Debug for StaticAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAuth")
            .field("header", &self.header)
            .field("prefix", &self.prefix)
            .field("key", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for StaticAuth {
    fn header_name(&self) -> &str {
        &self.header
    }

    async fn header_value(&self, _cancel: &CancellationToken) -> Result<String, AuthError> {
        Ok(self.value())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
