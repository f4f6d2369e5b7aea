//! HTTP API: the payment endpoints plus health, metrics and static assets.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ErrorEnvelope};
pub use handlers::AppState;
pub use routes::create_router;
