//! Client and axum middleware for the ezpass identity service.
//!
//! ```ignore
//! let client = EzpassClient::new(ClientConfig::new("https://ezpass.example.com"))?;
//! let pass = client.lookup_user(&token).await?;
//!
//! let app = middleware::auth::ezpass::apply(routes, EzpassAuth::new(client));
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{ErrorKind, LookupError, UnknownCause};
pub use middleware::auth::credentials::{GroupIdResolver, extract_token};
pub use middleware::auth::ezpass::{EzpassAuth, auth_handler};
pub use services::ezpass::{Authenticator, ClientConfig, EzpassClient, Pass};
