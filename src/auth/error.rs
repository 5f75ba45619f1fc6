//! Authentication error type.

use thiserror::Error;

use crate::client::ApiError;

/// Failure to obtain a usable credential.
///
/// `Clone` because a single refresh outcome is shared with every caller
/// waiting on it.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Token request never reached the endpoint or never returned
    #[error("token request failed: {0}")]
    Transport(String),

    /// Token endpoint answered with a non-200 status
    #[error("token endpoint rejected the request: {0}")]
    TokenEndpoint(ApiError),

    /// Token response body was not the expected JSON shape
    #[error("invalid token response: {0}")]
    Decode(String),

    /// 200 response without a usable `access_token`
    #[error("token response contained no access token")]
    EmptyToken,

    /// Credential cannot be sent as an HTTP header value
    #[error("credential is not a valid header value: {0}")]
    InvalidHeader(String),

    /// Caller gave up waiting for the refresh
    #[error("token refresh cancelled")]
    Cancelled,
}

impl AuthError {
    /// The classified token endpoint response, if that is what failed.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            AuthError::TokenEndpoint(err) => Some(err),
            _ => None,
        }
    }
}
