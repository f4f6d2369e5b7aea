//! Application configuration loaded from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ServiceError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Stripe Credentials ===
    /// Secret API key (starts with sk_ or rk_).
    pub stripe_secret_key: String,

    /// Stripe API base URL.
    #[serde(default = "default_api_url")]
    pub stripe_api_url: String,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Static Assets ===
    /// Directory holding the client HTML/JS.
    pub static_dir: PathBuf,

    // === Server Configuration ===
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose Prometheus metrics on /metrics.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_api_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    4242
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Build a config with defaults for everything but the key and asset dir.
    pub fn new(stripe_secret_key: impl Into<String>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_api_url: default_api_url(),
            http_timeout_ms: default_http_timeout_ms(),
            static_dir: static_dir.into(),
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_true(),
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.stripe_secret_key.is_empty() {
            return Err(invalid("STRIPE_SECRET_KEY is required"));
        }

        if !self.stripe_secret_key.starts_with("sk_") && !self.stripe_secret_key.starts_with("rk_")
        {
            return Err(invalid("STRIPE_SECRET_KEY must start with sk_ or rk_"));
        }

        if self.static_dir.as_os_str().is_empty() {
            return Err(invalid("STATIC_DIR is required"));
        }

        if !self.static_dir.is_dir() {
            return Err(invalid(format!(
                "STATIC_DIR {} is not a directory",
                self.static_dir.display()
            )));
        }

        Ok(())
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the key targets Stripe test mode.
    pub fn is_test_mode(&self) -> bool {
        self.stripe_secret_key.contains("_test_")
    }

    /// Secret key with everything but the prefix and last four characters hidden.
    pub fn masked_key(&self) -> String {
        let key = &self.stripe_secret_key;
        match (key.find('_'), key.len().checked_sub(4)) {
            (Some(prefix_end), Some(tail)) if tail > prefix_end => {
                let prefix = key.get(..=prefix_end).unwrap_or_default();
                let suffix = key.get(tail..).unwrap_or_default();
                format!("{prefix}...{suffix}")
            }
            _ => "***".to_string(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> ServiceError {
    ServiceError::InvalidConfig(msg.into())
}
