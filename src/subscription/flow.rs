//! Flow (usage quota) lookup for remote subscriptions.
//!
//! Providers report usage in a `subscription-userinfo` response header:
//!
//! ```text
//! upload=455727941; download=6174315083; total=1073741824000; expire=1671815872
//! ```
//!
//! `upload`, `download` and `total` are mandatory; `expire` is a UNIX
//! timestamp and may be missing.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;
use crate::error::FlowError;

/// Name of the header carrying flow info.
pub const FLOW_HEADER: &str = "subscription-userinfo";

static UPLOAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"upload=(\d+)").expect("valid regex"));
static DOWNLOAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"download=(\d+)").expect("valid regex"));
static TOTAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"total=(\d+)").expect("valid regex"));
static EXPIRE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"expire=(\d+)").expect("valid regex"));

/// Traffic used so far, in the provider's unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowUsage {
    /// Uploaded amount.
    pub upload: u64,
    /// Downloaded amount.
    pub download: u64,
}

/// Parsed flow header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowInfo {
    /// Expiry as a UNIX timestamp in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    /// Quota.
    pub total: u64,
    /// Usage.
    pub usage: FlowUsage,
}

fn capture(re: &Regex, header: &str) -> Option<u64> {
    re.captures(header)?.get(1)?.as_str().parse().ok()
}

impl FlowInfo {
    /// Parse a flow header. Returns `None` when any of `upload`, `download`
    /// or `total` is missing or out of range.
    pub fn parse(header: &str) -> Option<Self> {
        let upload = capture(&UPLOAD_RE, header)?;
        let download = capture(&DOWNLOAD_RE, header)?;
        let total = capture(&TOTAL_RE, header)?;
        let expires = capture(&EXPIRE_RE, header);

        Some(Self {
            expires,
            total,
            usage: FlowUsage { upload, download },
        })
    }

    /// Amount left before the quota is exhausted.
    pub fn remaining(&self) -> u64 {
        self.total
            .saturating_sub(self.usage.upload.saturating_add(self.usage.download))
    }
}

/// Source of raw flow headers.
#[async_trait]
pub trait FlowFetcher: Send + Sync {
    /// Fetch the flow header for `url`. `Ok(None)` means the remote answered
    /// successfully but without one.
    async fn fetch_flow_headers(&self, url: &str) -> Result<Option<String>, FlowError>;
}

/// Fetches flow headers over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFlowFetcher {
    http: reqwest::Client,
}

impl HttpFlowFetcher {
    /// Build a fetcher from config.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.flow_timeout_ms))
            .connect_timeout(Duration::from_millis(config.flow_timeout_ms.min(5_000)))
            .user_agent(config.flow_user_agent.clone())
            .build()?;

        Ok(Self { http })
    }

    /// Wrap an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl FlowFetcher for HttpFlowFetcher {
    #[instrument(skip(self))]
    async fn fetch_flow_headers(&self, url: &str) -> Result<Option<String>, FlowError> {
        let parsed = Url::parse(url).map_err(|source| FlowError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self.http.get(parsed).send().await?;
        let status = response.status();
        debug!(%status, "Flow request answered");

        let header = response
            .headers()
            .get(FLOW_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if header.is_none() && !status.is_success() {
            return Err(FlowError::Status(status.as_u16()));
        }

        Ok(header)
    }
}
