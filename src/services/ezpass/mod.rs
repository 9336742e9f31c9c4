pub mod client;
pub mod deadline;
pub mod factory;
pub mod pass;
pub mod urls;

pub use client::{Authenticator, ClientConfig, DEFAULT_TIMEOUT, EzpassClient};
pub use factory::build_ezpass_client;
pub use pass::{Membership, Pass, User};
