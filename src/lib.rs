//! # orbital-client
//!
//! Shared runtime core for satellite-imagery vendor SDKs (tasking, catalog
//! search, ordering). Vendor service layers build on three pieces:
//!
//! - [`auth`]: pluggable authentication, from static API keys to OAuth2
//!   grants with cached, single-flight token refresh
//! - [`client`]: the request executor every call goes through, and the
//!   [`ApiError`] classification of failed responses
//! - [`pagination`]: cursor, page-number and offset/limit list endpoints as
//!   one lazy stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orbital_client::{Client, OAuth2Auth, Paginator, CursorPage};
//! use futures::StreamExt;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Order {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), orbital_client::Error> {
//!     let auth = OAuth2Auth::client_credentials(
//!         "https://auth.example.com/oauth/token",
//!         "client-id",
//!         "client-secret",
//!     )?;
//!     let client = Client::builder()
//!         .base_url("https://api.example.com/v2")
//!         .auth(auth)
//!         .build()?;
//!
//!     let order: Order = client.get("/orders/42").send().await?;
//!     println!("{}", order.id);
//!
//!     let mut orders = Paginator::cursor(|cursor| {
//!         client.get("/orders").query_opt("cursor", cursor).send::<CursorPage<Order>>()
//!     })
//!     .items();
//!     while let Some(order) = orders.next().await {
//!         println!("{}", order?.id);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
mod cancel;
pub mod client;
pub mod pagination;
pub mod prelude;

pub use auth::{
    AuthConfig, AuthError, Authenticator, Credential, CredentialStore, Grant, OAuth2Auth,
    REFRESH_BUFFER, StaticAuth,
};
pub use client::{
    ANY_SUCCESS, ApiError, ApiRequest, Client, ClientBuilder, ClientConfig, ClientSettings,
    ConfigError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FieldError, parse_error_response,
};
pub use pagination::{CursorPage, FlatPage, NumberedPage, OffsetWindow, Page, Paginator};
pub use tokio_util::sync::CancellationToken;

/// Error type for every client operation.
///
/// Branch on the variant, or on the status predicates, rather than on the
/// message text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Request never reached the server or no response came back.
    #[error("Network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// No usable credential could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(#[source] AuthError),

    /// Server answered with a status other than the expected one.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Request could not be built (body encoding, URL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cancellation token fired before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// The API error carried by this error, including a token endpoint
    /// rejection wrapped in [`Error::Auth`].
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            Error::Auth(err) => err.api_error(),
            _ => None,
        }
    }

    /// HTTP status of a resource call that returned an unexpected status.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }

    fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api().is_some_and(ApiError::is_not_found)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api().is_some_and(ApiError::is_unauthorized)
    }

    pub fn is_forbidden(&self) -> bool {
        self.api().is_some_and(ApiError::is_forbidden)
    }

    pub fn is_bad_request(&self) -> bool {
        self.api().is_some_and(ApiError::is_bad_request)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.api().is_some_and(ApiError::is_rate_limited)
    }

    pub fn is_conflict(&self) -> bool {
        self.api().is_some_and(ApiError::is_conflict)
    }

    pub fn is_validation_error(&self) -> bool {
        self.api().is_some_and(ApiError::is_validation_error)
    }

    pub fn is_client_error(&self) -> bool {
        self.api().is_some_and(ApiError::is_client_error)
    }

    pub fn is_server_error(&self) -> bool {
        self.api().is_some_and(ApiError::is_server_error)
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Cancelled => Error::Cancelled,
            other => Error::Auth(other),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { key } => Error::Config(format!("Missing required setting: {}", key)),
            other => Error::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_predicates() {
        let err = Error::Api(ApiError::new(404, "no such order"));
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "API error (HTTP 404): no such order");
    }

    #[test]
    fn test_validation_overlay_keeps_identity() {
        let body = r#"{"detail":[{"loc":["body","aoi"],"msg":"field required"}]}"#;
        let err = Error::from(parse_error_response(422, body));
        assert!(err.is_validation_error());
        assert!(err.is_client_error());
        assert!(err.api_error().unwrap().field_errors.is_some());
    }

    #[test]
    fn test_token_endpoint_failure_is_not_api_error() {
        let err = Error::from(AuthError::TokenEndpoint(ApiError::new(401, "bad secret")));
        assert!(err.is_auth_error());
        assert!(!err.is_unauthorized());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.api_error().map(|e| e.status), Some(401));
    }

    #[test]
    fn test_auth_cancel_maps_to_cancelled() {
        let err = Error::from(AuthError::Cancelled);
        assert!(err.is_cancelled());
        assert!(!err.is_auth_error());
    }

    #[test]
    fn test_non_api_errors_have_no_status() {
        let err = Error::InvalidRequest("bad path".into());
        assert!(!err.is_not_found());
        assert!(!err.is_client_error());
        assert!(err.api_error().is_none());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: Error = ConfigError::Missing {
            key: "UP42_BASE_URL".into(),
        }
        .into();
        assert!(matches!(err, Error::Config(ref m) if m.contains("UP42_BASE_URL")));
    }
}
