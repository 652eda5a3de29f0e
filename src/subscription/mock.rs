//! Mock flow fetcher for unit testing.
//!
//! Serves canned flow headers per URL without touching the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::FlowError;

use super::flow::FlowFetcher;

/// Canned answer for one URL.
#[derive(Debug, Clone)]
pub enum MockFlowResponse {
    /// Remote answers with this header.
    Header(String),
    /// Remote answers without a flow header.
    NoHeader,
    /// Remote answers with this error status and no flow header.
    Status(u16),
}

/// Mock flow fetcher for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFlowFetcher {
    responses: Arc<Mutex<HashMap<String, MockFlowResponse>>>,
    calls: Arc<AtomicUsize>,
}

impl MockFlowFetcher {
    /// Create a fetcher that answers 404 for every URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn respond(&self, url: impl Into<String>, response: MockFlowResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.into(), response);
    }

    /// Answer `url` with a flow header.
    pub fn with_header(self, url: impl Into<String>, header: impl Into<String>) -> Self {
        self.respond(url, MockFlowResponse::Header(header.into()));
        self
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlowFetcher for MockFlowFetcher {
    async fn fetch_flow_headers(&self, url: &str) -> Result<Option<String>, FlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .cloned()
            .unwrap_or(MockFlowResponse::Status(404));

        match response {
            MockFlowResponse::Header(header) => Ok(Some(header)),
            MockFlowResponse::NoHeader => Ok(None),
            MockFlowResponse::Status(code) => Err(FlowError::Status(code)),
        }
    }
}
