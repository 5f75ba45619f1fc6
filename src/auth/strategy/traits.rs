//! Authenticator trait.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthError;

/// Produces the authentication header for outgoing requests.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Header the credential travels in.
    fn header_name(&self) -> &str {
        "Authorization"
    }

    /// Current header value, refreshing the underlying credential first if
    /// it is stale.
    async fn header_value(&self, cancel: &CancellationToken) -> Result<String, AuthError>;

    /// Attach authentication to `request`.
    ///
    /// No network call is made for the request itself when this fails.
    async fn apply(
        &self,
        request: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<reqwest::RequestBuilder, AuthError> {
        let value = self.header_value(cancel).await?;
        let mut value = HeaderValue::try_from(value)
            .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        Ok(request.header(self.header_name(), value))
    }

    /// Adopt the owning client's transport for any requests the
    /// authenticator makes itself. `None` leaves that setting as configured.
    fn bind_transport(&mut self, _http: Option<&reqwest::Client>, _timeout: Option<Duration>) {}

    /// Strategy name for logging/debugging.
    fn name(&self) -> &'static str;
}
