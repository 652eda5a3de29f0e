//! Unified error types for the subscription store.

use thiserror::Error;

/// Unified error type for the service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error, e.g. binding the listener.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored value could not be (de)serialized.
    #[error("store value is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,

    /// The blocking write task panicked or was cancelled.
    #[error("store write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors fetching flow headers from a remote subscription.
#[derive(Error, Debug)]
pub enum FlowError {
    /// The subscription has no URL to fetch.
    #[error("subscription has no url")]
    MissingUrl,

    /// The subscription URL does not parse.
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// The remote answered with an error status and no flow header.
    #[error("remote answered with status {0}")]
    Status(u16),

    /// The request itself failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Subscription lookup and mutation errors.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    /// No subscription with this name.
    #[error("subscription {0} does not exist")]
    NotFound(String),

    /// A subscription with this name already exists.
    #[error("subscription {0} already exists")]
    AlreadyExists(String),

    /// Local subscriptions carry no remote flow info.
    #[error("subscription {0} is local and has no flow info")]
    LocalSource(String),

    /// The remote answered but sent no flow header.
    #[error("no flow info for subscription {0}")]
    NoFlowInfo(String),

    /// The remote could not be fetched, or its flow header was malformed.
    #[error("url for subscription {name} is inaccessible: {reason}")]
    Unreachable {
        /// Subscription name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Underlying storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
