//! HTTP client shared by vendor service layers.

mod config;
mod error;
mod request;

pub use config::{ClientConfig, ClientSettings, ConfigError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use error::{ApiError, FieldError, parse_error_response};
pub use request::{ANY_SUCCESS, ApiRequest};

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{AuthConfig, Authenticator};
use crate::{Error, Result};

/// Cheaply cloneable handle to an immutable [`ClientConfig`].
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn from_settings(settings: ClientSettings) -> Result<Self> {
        Self::builder().settings(settings).build()
    }

    /// Build a client from `<PREFIX>_*` environment variables.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_settings(ClientSettings::from_env(prefix)?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn request(&self, method: Method, path: impl Into<String>) -> ApiRequest<'_> {
        ApiRequest::new(&self.config, method, path)
    }

    pub fn get(&self, path: impl Into<String>) -> ApiRequest<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> ApiRequest<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: impl Into<String>) -> ApiRequest<'_> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> ApiRequest<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> ApiRequest<'_> {
        self.request(Method::DELETE, path)
    }

    /// Perform one call and decode the response into `T`.
    ///
    /// `expected_status` of [`ANY_SUCCESS`] accepts any 2xx; otherwise only
    /// that exact status counts as success.
    pub async fn execute<B, T>(
        &self,
        method: Method,
        path: &str,
        expected_status: u16,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method, path).expect_status(expected_status);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url.as_str())
            .field("auth", &self.config.auth.name())
            .finish()
    }
}

enum AuthSource {
    Owned(Box<dyn Authenticator>),
    Shared(Arc<dyn Authenticator>),
    Config(AuthConfig),
}

#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    http: Option<reqwest::Client>,
    auth: Option<AuthSource>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, pooling).
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Authenticate with `auth`. Token requests it makes go through this
    /// builder's [`http_client`](Self::http_client) and
    /// [`timeout`](Self::timeout) when those are set.
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(AuthSource::Owned(Box::new(auth)));
        self
    }

    /// Share one authenticator (and its token cache) between clients.
    ///
    /// A shared authenticator keeps the transport it was built with.
    pub fn shared_auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(AuthSource::Shared(auth));
        self
    }

    /// Build the authenticator from declarative settings at [`build`](Self::build) time.
    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth = Some(AuthSource::Config(config));
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.base_url = Some(settings.base_url);
        if let Some(user_agent) = settings.user_agent {
            self.user_agent = Some(user_agent);
        }
        if let Some(secs) = settings.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        self.auth_config(settings.auth)
    }

    pub fn build(self) -> Result<Client> {
        let raw = self
            .base_url
            .ok_or_else(|| Error::Config("base URL is required".into()))?;
        let base_url = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("invalid base URL {:?}: {}", raw, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL must be http or https, got {:?}",
                base_url.scheme()
            )));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(Error::Config("timeout must be non-zero".into()));
        }

        let custom_http = self.http.is_some();
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder().build()?,
        };

        let auth: Arc<dyn Authenticator> = match self.auth {
            Some(AuthSource::Owned(mut auth)) => {
                auth.bind_transport(custom_http.then_some(&http), self.timeout);
                Arc::from(auth)
            }
            Some(AuthSource::Shared(auth)) => auth,
            Some(AuthSource::Config(config)) => config.into_authenticator(http.clone(), timeout)?,
            None => return Err(Error::Config("authenticator is required".into())),
        };

        Ok(Client {
            config: Arc::new(ClientConfig {
                base_url,
                http,
                auth,
                user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into()),
                timeout,
            }),
        })
    }
}
