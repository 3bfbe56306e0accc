//! Configuration management for the opsdesk backend

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// API behaviour
    #[serde(default)]
    pub api: ApiConfig,

    /// Checkout and billing portal redirects
    #[serde(default)]
    pub billing: BillingConfig,

    /// HTTP client used by tools talking to the server
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Load the bundled sample records at startup
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
}

/// Billing redirect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Base URL of hosted checkout pages
    #[serde(default = "default_checkout_base_url")]
    pub checkout_base_url: String,

    /// Base URL of the hosted billing portal
    #[serde(default = "default_portal_base_url")]
    pub portal_base_url: String,

    /// Currency used when a request does not name one
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the opsdesk API
    #[serde(default = "default_client_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_client_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound for a single retry delay in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or text)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_enable_cors() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_seed_sample_data() -> bool {
    true
}

fn default_checkout_base_url() -> String {
    "https://checkout.opsdesk.local/pay".to_string()
}

fn default_portal_base_url() -> String {
    "https://billing.opsdesk.local/portal".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_client_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

const fn default_client_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff() -> u64 {
    250
}

const fn default_max_backoff() -> u64 {
    4_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: default_enable_cors(),
            cors_origins: default_cors_origins(),
            request_timeout: default_request_timeout(),
            seed_sample_data: default_seed_sample_data(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: default_checkout_base_url(),
            portal_base_url: default_portal_base_url(),
            default_currency: default_currency(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_client_base_url(),
            timeout_secs: default_client_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as Duration
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl ClientConfig {
    /// Per-request timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from `config.*` in the working directory and
    /// `OPSDESK_*` environment variables (`__` separates nested keys)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or parsed.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, preferring an explicit file when given
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any source
    /// cannot be parsed.
    pub fn load_from(path: Option<&Path>) -> crate::Result<Self> {
        let file_source = path.map_or_else(
            || config::File::with_name("config").required(false),
            |path| config::File::from(PathBuf::from(path)).required(true),
        );

        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix("OPSDESK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| crate::Error::Configuration {
                message: e.to_string(),
            })?;

        config
            .try_deserialize()
            .map_err(|e| crate::Error::Configuration {
                message: e.to_string(),
            })
    }

    /// Socket address string the server binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
