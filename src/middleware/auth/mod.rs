//! ezpass-backed authentication for axum routers.

pub mod credentials;
pub mod ezpass;
