//! Authentication strategies.

mod api_key;
mod oauth;
mod token;
mod traits;

pub use api_key::StaticAuth;
pub use oauth::OAuth2Auth;
pub use token::Grant;
pub use traits::Authenticator;
