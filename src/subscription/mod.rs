//! Subscription domain.
//!
//! This module handles:
//! - Subscription and collection records
//! - Flow header fetching and parsing
//! - The service implementing CRUD with collection cascades
//! - Mock flow fetcher for testing

pub mod flow;
pub mod mock;
pub mod service;
pub mod types;

pub use flow::{FlowFetcher, FlowInfo, FlowUsage, HttpFlowFetcher};
pub use mock::{MockFlowFetcher, MockFlowResponse};
pub use service::SubscriptionService;
pub use types::{Collection, Source, Subscription, SubscriptionPatch};
