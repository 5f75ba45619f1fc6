//! Client configuration.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::auth::{AuthConfig, Authenticator};
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("orbital-client/", env!("CARGO_PKG_VERSION"));

/// Errors raised while assembling a client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required setting absent
    #[error("Missing required setting: {key}")]
    Missing {
        /// Setting or environment variable name
        key: String,
    },

    /// Setting present but unusable
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting or environment variable name
        key: String,
        /// Why the value was rejected
        message: String,
    },

    /// Settings file is not valid JSON for [`ClientSettings`]
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable per-client settings. Build a new client to change any of them.
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) http: reqwest::Client,
    pub(crate) auth: Arc<dyn Authenticator>,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
}

impl ClientConfig {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn auth(&self) -> &dyn Authenticator {
        self.auth.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for `path`, joined onto the base URL.
    ///
    /// Paths that are already absolute `http(s)` URLs (next-page links)
    /// are used unchanged.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&joined)
            .map_err(|e| Error::InvalidRequest(format!("invalid request path {:?}: {}", path, e)))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth.name())
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Serializable client settings, loaded from a JSON file or the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub base_url: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub auth: AuthConfig,
}

impl ClientSettings {
    pub async fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read `<PREFIX>_BASE_URL`, `<PREFIX>_USER_AGENT`, `<PREFIX>_TIMEOUT_SECS`
    /// and the authentication variables described on [`AuthConfig::from_env`].
    pub fn from_env(prefix: &str) -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);

        let base_url = lookup(&key("BASE_URL")).ok_or_else(|| ConfigError::Missing {
            key: key("BASE_URL"),
        })?;
        let timeout_secs = lookup(&key("TIMEOUT_SECS"))
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    key: key("TIMEOUT_SECS"),
                    message: format!("{}", e),
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            user_agent: lookup(&key("USER_AGENT")),
            timeout_secs,
            auth: AuthConfig::from_lookup(prefix, &lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("UP42_BASE_URL", "https://api.example.com/v2"),
            ("UP42_TIMEOUT_SECS", "12"),
            ("UP42_API_KEY", "k"),
        ]
        .into_iter()
        .collect();
        let settings =
            ClientSettings::from_lookup("UP42", |k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.base_url, "https://api.example.com/v2");
        assert_eq!(settings.timeout_secs, Some(12));
        assert!(settings.user_agent.is_none());
    }

    #[test]
    fn test_settings_invalid_timeout() {
        let err = ClientSettings::from_lookup("X", |k| match k {
            "X_BASE_URL" => Some("https://api.example.com".into()),
            "X_TIMEOUT_SECS" => Some("soon".into()),
            "X_API_KEY" => Some("k".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "X_TIMEOUT_SECS"));
    }

    #[test]
    fn test_settings_missing_base_url() {
        let err = ClientSettings::from_lookup("X", |_| None).unwrap_err();
        assert!(err.to_string().contains("X_BASE_URL"));
    }

    #[test]
    fn test_settings_deserialize() {
        let settings: ClientSettings = serde_json::from_str(
            r#"{"base_url":"https://api.example.com","timeout_secs":5,
                "auth":{"type":"bearer","token":"t"}}"#,
        )
        .unwrap();
        assert_eq!(settings.timeout_secs, Some(5));
        assert!(matches!(settings.auth, AuthConfig::Bearer { .. }));
    }
}
