//! HTTP server for folio.
//!
//! Exposes the version-history service as a REST API with bearer-token
//! authentication and a Server-Sent Events change feed.

pub mod auth;
pub mod error;
pub mod routes;
pub mod sse;
pub mod state;

pub use auth::{AuthError, Claims, JwtValidator};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
