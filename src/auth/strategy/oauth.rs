//! OAuth2 authentication with cached, single-flight token refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Authenticator;
use super::token::{Grant, request_token};
use crate::auth::{AuthError, Credential, CredentialStore, REFRESH_BUFFER};
use crate::client::DEFAULT_TIMEOUT;
use crate::{Error, Result};

/// Bearer authentication backed by an OAuth2 token endpoint.
///
/// The access token is cached and refreshed when less than the refresh
/// buffer (30s by default) remains. Concurrent requests that find the token
/// stale share a single token request.
#[derive(Debug, Clone)]
pub struct OAuth2Auth {
    http: reqwest::Client,
    token_url: Url,
    grant: Grant,
    store: Arc<CredentialStore>,
    refresh_buffer: Duration,
    timeout: Duration,
}

impl OAuth2Auth {
    pub fn new(token_url: &str, grant: Grant) -> Result<Self> {
        let token_url = Url::parse(token_url)
            .map_err(|e| Error::Config(format!("invalid token URL {:?}: {}", token_url, e)))?;
        let http = reqwest::Client::builder().build().map_err(Error::Transport)?;
        Ok(Self {
            http,
            token_url,
            grant,
            store: Arc::new(CredentialStore::new()),
            refresh_buffer: REFRESH_BUFFER,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn client_credentials(
        token_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            token_url,
            Grant::ClientCredentials {
                client_id: client_id.into(),
                client_secret: SecretString::from(client_secret.into()),
                scopes: Vec::new(),
            },
        )
    }

    /// Resource-owner password grant; `basic` is the already base64-encoded
    /// client credential.
    pub fn password(
        token_url: &str,
        basic: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            token_url,
            Grant::Password {
                basic: SecretString::from(basic.into()),
                username: username.into(),
                password: SecretString::from(password.into()),
            },
        )
    }

    pub fn jwt(
        token_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            token_url,
            Grant::Jwt {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
        )
    }

    /// Requested scopes; ignored by grants other than client credentials.
    pub fn with_scopes(mut self, requested: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let Grant::ClientCredentials { scopes, .. } = &mut self.grant {
            *scopes = requested.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Seed the cache, e.g. with a token persisted from an earlier run.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.store = Arc::new(CredentialStore::with_credential(credential));
        self
    }

    pub fn grant(&self) -> &Grant {
        &self.grant
    }

    /// Snapshot of the cached credential.
    pub fn credential(&self) -> Option<Credential> {
        self.store.current()
    }

    /// Drop the cached token; the next request fetches a new one.
    pub fn invalidate(&self) {
        self.store.invalidate();
    }

    /// Valid credential, refreshing it if stale.
    pub async fn token(&self, cancel: &CancellationToken) -> std::result::Result<Credential, AuthError> {
        self.store
            .get_or_refresh(self.refresh_buffer, cancel, || {
                request_token(
                    self.http.clone(),
                    self.token_url.clone(),
                    self.grant.clone(),
                    self.timeout,
                )
            })
            .await
    }
}

#[async_trait]
impl Authenticator for OAuth2Auth {
    async fn header_value(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, AuthError> {
        let credential = self.token(cancel).await?;
        Ok(format!("Bearer {}", credential.secret()))
    }

    fn bind_transport(&mut self, http: Option<&reqwest::Client>, timeout: Option<Duration>) {
        if let Some(http) = http {
            self.http = http.clone();
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
    }

    fn name(&self) -> &'static str {
        self.grant.name()
    }
}
