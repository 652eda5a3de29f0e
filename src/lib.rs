//! Subscription store service.
//!
//! Keeps a list of proxy subscriptions and the collections that group them in
//! a JSON-file key-value store, and serves them over a small REST API:
//!
//! ```text
//! GET    /api/subs              list subscriptions
//! POST   /api/subs              create a subscription
//! GET    /api/sub/:name         fetch one
//! PATCH  /api/sub/:name         merge fields, renaming cascades into collections
//! DELETE /api/sub/:name         remove, and drop it from every collection
//! GET    /api/sub/flow/:name    remote usage quota (subscription-userinfo)
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Key-value persistence and named-record helpers
//! - [`subscription`]: Records, flow lookup and the CRUD service
//! - [`api`]: HTTP handlers and routes
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod subscription;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
