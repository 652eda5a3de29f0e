//! HTTP API module for subscription CRUD, flow lookup, health and metrics.

pub mod handlers;
pub mod response;
pub mod routes;

pub use handlers::AppState;
pub use response::{ApiError, ApiSuccess, ErrorCode, ErrorType};
pub use routes::{create_router, serve};
