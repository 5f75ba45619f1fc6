//! Declarative authentication settings.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use super::{Authenticator, OAuth2Auth, StaticAuth};
use crate::Result;
use crate::client::ConfigError;

/// Authentication settings as found in a settings file or the environment.
///
/// ```json
/// {"type": "client_credentials", "token_url": "https://auth.example.com/oauth/token",
///  "client_id": "abc", "client_secret": "xyz", "scopes": ["catalog"]}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// `Authorization: ApiKey <key>`, or the bare key in `header` when set.
    ApiKey {
        #[serde(deserialize_with = "secret")]
        key: SecretString,
        #[serde(default)]
        header: Option<String>,
    },
    Bearer {
        #[serde(deserialize_with = "secret")]
        token: SecretString,
    },
    ClientCredentials {
        token_url: String,
        client_id: String,
        #[serde(deserialize_with = "secret")]
        client_secret: SecretString,
        #[serde(default)]
        scopes: Vec<String>,
    },
    Password {
        token_url: String,
        #[serde(deserialize_with = "secret")]
        basic: SecretString,
        username: String,
        #[serde(deserialize_with = "secret")]
        password: SecretString,
    },
    Jwt {
        token_url: String,
        username: String,
        #[serde(deserialize_with = "secret")]
        password: SecretString,
    },
}

fn secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl AuthConfig {
    /// Read `<PREFIX>_*` environment variables.
    ///
    /// Checked in order: `_API_KEY`, `_TOKEN`, `_CLIENT_ID` + `_CLIENT_SECRET`
    /// (with `_TOKEN_URL` and optional space-separated `_SCOPES`), then
    /// `_USERNAME` + `_PASSWORD` (with `_TOKEN_URL`; `_BASIC` selects the
    /// password grant, otherwise JWT).
    pub fn from_env(prefix: &str) -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let var = |suffix: &str| {
            lookup(&format!("{}_{}", prefix, suffix)).filter(|v| !v.trim().is_empty())
        };
        let required = |suffix: &str| {
            var(suffix).ok_or_else(|| ConfigError::Missing {
                key: format!("{}_{}", prefix, suffix),
            })
        };

        if let Some(key) = var("API_KEY") {
            return Ok(AuthConfig::ApiKey {
                key: key.into(),
                header: var("API_KEY_HEADER"),
            });
        }
        if let Some(token) = var("TOKEN") {
            return Ok(AuthConfig::Bearer {
                token: token.into(),
            });
        }
        if let Some(client_id) = var("CLIENT_ID") {
            return Ok(AuthConfig::ClientCredentials {
                token_url: required("TOKEN_URL")?,
                client_id,
                client_secret: required("CLIENT_SECRET")?.into(),
                scopes: var("SCOPES")
                    .map(|s| s.split_whitespace().map(String::from).collect())
                    .unwrap_or_default(),
            });
        }
        if let Some(username) = var("USERNAME") {
            let token_url = required("TOKEN_URL")?;
            let password = required("PASSWORD")?.into();
            return Ok(match var("BASIC") {
                Some(basic) => AuthConfig::Password {
                    token_url,
                    basic: basic.into(),
                    username,
                    password,
                },
                None => AuthConfig::Jwt {
                    token_url,
                    username,
                    password,
                },
            });
        }

        Err(ConfigError::Missing {
            key: format!("{}_API_KEY", prefix),
        })
    }

    /// Build the matching authenticator; OAuth2 variants share `http`.
    pub fn into_authenticator(
        self,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Arc<dyn Authenticator>> {
        let oauth = |auth: OAuth2Auth| auth.with_http_client(http.clone()).with_timeout(timeout);

        Ok(match self {
            AuthConfig::ApiKey { key, header } => match header {
                Some(header) => Arc::new(StaticAuth::new("", key.expose_secret()).with_header(header)),
                None => Arc::new(StaticAuth::api_key(key.expose_secret())),
            },
            AuthConfig::Bearer { token } => Arc::new(StaticAuth::bearer(token.expose_secret())),
            AuthConfig::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scopes,
            } => Arc::new(oauth(
                OAuth2Auth::client_credentials(&token_url, client_id, client_secret.expose_secret())?
                    .with_scopes(scopes),
            )),
            AuthConfig::Password {
                token_url,
                basic,
                username,
                password,
            } => Arc::new(oauth(OAuth2Auth::password(
                &token_url,
                basic.expose_secret(),
                username,
                password.expose_secret(),
            )?)),
            AuthConfig::Jwt {
                token_url,
                username,
                password,
            } => Arc::new(oauth(OAuth2Auth::jwt(
                &token_url,
                username,
                password.expose_secret(),
            )?)),
        })
    }
}
