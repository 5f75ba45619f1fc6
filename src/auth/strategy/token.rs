//! OAuth2 token endpoint protocol.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::{Url, form_urlencoded};

use crate::auth::{AuthError, Credential};
use crate::client::parse_error_response;

/// How an access token is obtained.
#[derive(Clone)]
pub enum Grant {
    /// `grant_type=client_credentials`, HTTP Basic from `client_id:client_secret`.
    ClientCredentials {
        client_id: String,
        client_secret: SecretString,
        scopes: Vec<String>,
    },
    /// Legacy resource-owner password grant with a pre-encoded Basic credential.
    Password {
        basic: SecretString,
        username: String,
        password: SecretString,
    },
    /// Username/password exchanged directly for a JWT, no client credential.
    Jwt {
        username: String,
        password: SecretString,
    },
}

impl Grant {
    pub fn name(&self) -> &'static str {
        match self {
            Grant::ClientCredentials { .. } => "client_credentials",
            Grant::Password { .. } => "password",
            Grant::Jwt { .. } => "jwt",
        }
    }

    fn form_body(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        match self {
            Grant::ClientCredentials { scopes, .. } => {
                form.append_pair("grant_type", "client_credentials");
                if !scopes.is_empty() {
                    form.append_pair("scope", &scopes.join(" "));
                }
            }
            Grant::Password {
                username, password, ..
            }
            | Grant::Jwt { username, password } => {
                form.append_pair("grant_type", "password");
                form.append_pair("username", username);
                form.append_pair("password", password.expose_secret());
            }
        }
        form.finish()
    }

    fn basic_auth(&self) -> Option<String> {
        match self {
            Grant::ClientCredentials {
                client_id,
                client_secret,
                ..
            } => {
                let raw = format!("{}:{}", client_id, client_secret.expose_secret());
                Some(format!("Basic {}", STANDARD.encode(raw)))
            }
            Grant::Password { basic, .. } => Some(format!("Basic {}", basic.expose_secret())),
            Grant::Jwt { .. } => None,
        }
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::ClientCredentials {
                client_id, scopes, ..
            } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("scopes", scopes)
                .finish_non_exhaustive(),
            Grant::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Grant::Jwt { username, .. } => f
                .debug_struct("Jwt")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
}

/// POST `grant` to `token_url` and turn the response into a [`Credential`].
pub(crate) async fn request_token(
    http: reqwest::Client,
    token_url: Url,
    grant: Grant,
    timeout: Duration,
) -> Result<Credential, AuthError> {
    debug!(grant = grant.name(), url = %token_url, "requesting access token");

    let mut request = http
        .post(token_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .timeout(timeout)
        .body(grant.form_body());
    if let Some(basic) = grant.basic_auth() {
        request = request.header(AUTHORIZATION, basic);
    }

    let result = exchange(request, &grant).await;
    match &result {
        Ok(cred) => debug!(
            grant = grant.name(),
            expires_in_secs = cred.remaining().map(|d| d.as_secs()),
            "access token refreshed"
        ),
        Err(e) => warn!(grant = grant.name(), error = %e, "token refresh failed"),
    }
    result
}

async fn exchange(request: reqwest::RequestBuilder, grant: &Grant) -> Result<Credential, AuthError> {
    let response = request
        .send()
        .await
        .map_err(|e| AuthError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Transport(e.to_string()))?;

    if status != 200 {
        return Err(AuthError::TokenEndpoint(parse_error_response(status, &body)));
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
    let access_token = token
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or(AuthError::EmptyToken)?;

    let expires_at = match token.expires_in.as_ref().and_then(seconds) {
        Some(secs) => TimeDelta::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d)),
        None if matches!(grant, Grant::Jwt { .. }) => jwt_expiry(&access_token),
        None => None,
    };

    Ok(Credential::new(access_token, expires_at))
}

// Some vendors send `expires_in` as a string.
fn seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Expiry from the `exp` claim of a JWT, without verifying the signature.
pub(crate) fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.get("exp")?.as_i64()?, 0)
}
