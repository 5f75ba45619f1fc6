//! Request executor: the single path every resource call takes.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::config::ClientConfig;
use super::error::parse_error_response;
use crate::cancel::cancellable;
use crate::{Error, Result};

const JSON: &str = "application/json";

/// Accept any 2xx status.
pub const ANY_SUCCESS: u16 = 0;

/// One pending call against the configured API.
///
/// Nothing is sent until a terminal method ([`send`](Self::send),
/// [`send_empty`](Self::send_empty) or [`bytes`](Self::bytes)) is awaited.
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest<'a> {
    config: &'a ClientConfig,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<std::result::Result<Vec<u8>, serde_json::Error>>,
    expected_status: u16,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(config: &'a ClientConfig, method: Method, path: impl Into<String>) -> Self {
        Self {
            config,
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            expected_status: ANY_SUCCESS,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add `value` as a query parameter when present.
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// JSON request body. Encoding happens here; a failure surfaces when
    /// the request is sent, before authentication runs.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(serde_json::to_vec(body));
        self
    }

    /// Require exactly `status`; [`ANY_SUCCESS`] (the default) accepts any 2xx.
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Override the client-wide timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Send and decode the JSON response body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `Option<_>` and `()` targets
    /// accept bodiless responses.
    pub async fn send<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.execute().await?;
        decode(&body)
    }

    /// Send and discard the response body.
    pub async fn send_empty(self) -> Result<()> {
        self.execute().await.map(drop)
    }

    /// Send and return the raw response body.
    pub async fn bytes(self) -> Result<Bytes> {
        self.execute().await
    }

    async fn execute(self) -> Result<Bytes> {
        let mut url = self.config.endpoint(&self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let body = self
            .body
            .transpose()
            .map_err(|e| Error::InvalidRequest(format!("failed to encode request body: {}", e)))?;

        let mut request = self
            .config
            .http
            .request(self.method, url)
            .header(ACCEPT, JSON)
            .header(USER_AGENT, self.config.user_agent.as_str())
            .timeout(self.timeout.unwrap_or(self.config.timeout));
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSON).body(body);
        }

        let request = self.config.auth.apply(request, &self.cancel).await?;

        let response = cancellable(&self.cancel, request.send())
            .await
            .ok_or(Error::Cancelled)??;
        let status = response.status().as_u16();
        let body = cancellable(&self.cancel, response.bytes())
            .await
            .ok_or(Error::Cancelled)??;

        if !status_matches(self.expected_status, status) {
            return Err(Error::Api(parse_error_response(
                status,
                &String::from_utf8_lossy(&body),
            )));
        }

        Ok(body)
    }
}

impl std::fmt::Debug for ApiRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("expected_status", &self.expected_status)
            .finish_non_exhaustive()
    }
}

fn status_matches(expected: u16, actual: u16) -> bool {
    if expected == ANY_SUCCESS {
        (200..300).contains(&actual)
    } else {
        expected == actual
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body).map_err(Error::Decode)
}
