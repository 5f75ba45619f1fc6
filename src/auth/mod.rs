//! Authentication for vendor APIs.
//!
//! Every outgoing request passes through an [`Authenticator`]:
//! - **Static**: constant API key or bearer token ([`StaticAuth`])
//! - **OAuth2 client credentials**, **resource-owner password** and **JWT**
//!   grants with cached, single-flight token refresh ([`OAuth2Auth`])

mod config;
mod credential;
mod error;
mod store;
mod strategy;

pub use config::AuthConfig;
pub use credential::{Credential, REFRESH_BUFFER};
pub use error::AuthError;
pub use store::CredentialStore;
pub use strategy::{Authenticator, Grant, OAuth2Auth, StaticAuth};
