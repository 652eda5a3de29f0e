//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Storage ===
    /// Path of the JSON file backing the key-value store.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    // === Server Configuration ===
    /// Address the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve Prometheus metrics on `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    // === Flow Lookup ===
    /// Timeout for fetching flow headers from a remote subscription.
    #[serde(default = "default_flow_timeout_ms")]
    pub flow_timeout_ms: u64,

    /// User-Agent sent when fetching flow headers. Providers only emit the
    /// usage header for clients they recognise.
    #[serde(default = "default_flow_user_agent")]
    pub flow_user_agent: String,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("sub-store.json")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_flow_timeout_ms() -> u64 {
    10_000
}

fn default_flow_user_agent() -> String {
    "Quantumult%20X/1.0.30 (iPhone14,2; iOS 15.6)".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_true(),
            flow_timeout_ms: default_flow_timeout_ms(),
            flow_user_agent: default_flow_user_agent(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.data_path.as_os_str().is_empty() {
            return Err("DATA_PATH must not be empty".to_string());
        }

        if self.flow_timeout_ms == 0 {
            return Err("FLOW_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.flow_user_agent.trim().is_empty() {
            return Err("FLOW_USER_AGENT must not be empty".to_string());
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
