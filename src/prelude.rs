//! Prelude module for convenient imports.
//!
//! Re-exports what a vendor service layer typically needs.
//!
//! # Usage
//!
//! ```rust
//! use orbital_client::prelude::*;
//! ```

// Core types
pub use crate::Error;
pub use crate::Result;

// Authentication
pub use crate::auth::{AuthConfig, Authenticator, Credential, OAuth2Auth, StaticAuth};

// Client
pub use crate::client::{ANY_SUCCESS, ApiError, ApiRequest, Client, ClientBuilder, ClientSettings};

// Pagination
pub use crate::pagination::{CursorPage, FlatPage, NumberedPage, OffsetWindow, Page, Paginator};

pub use tokio_util::sync::CancellationToken;
