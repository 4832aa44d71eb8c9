use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Default message used by the test-notification route.
pub const DEFAULT_TEST_MESSAGE: &str = "\u{2705} Test notification from *Herald*";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the API server binds to (default: 0.0.0.0:5299)
    pub bind_addr: SocketAddr,

    /// Total delivery attempts per destination, first try included (default: 5)
    pub max_attempts: u32,

    /// TCP/TLS connect timeout for retried deliveries, in seconds (default: 5)
    pub connect_timeout_secs: u64,

    /// Read timeout for retried deliveries, in seconds (default: 20)
    pub read_timeout_secs: u64,

    /// Combined timeout for the single-attempt delivery path, in seconds (default: 15)
    pub single_attempt_timeout_secs: u64,

    /// Message sent by `POST /test-notification`
    pub test_message: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_addr: std::env::var("HERALD_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5299".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HERALD_BIND_ADDR must be a valid socket address"))?,
            max_attempts: std::env::var("HERALD_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HERALD_MAX_ATTEMPTS must be a valid u32"))?,
            connect_timeout_secs: std::env::var("HERALD_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HERALD_CONNECT_TIMEOUT_SECS must be a valid u64"))?,
            read_timeout_secs: std::env::var("HERALD_READ_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HERALD_READ_TIMEOUT_SECS must be a valid u64"))?,
            single_attempt_timeout_secs: std::env::var("HERALD_SINGLE_ATTEMPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("HERALD_SINGLE_ATTEMPT_TIMEOUT_SECS must be a valid u64")
                })?,
            test_message: std::env::var("HERALD_TEST_MESSAGE")
                .unwrap_or_else(|_| DEFAULT_TEST_MESSAGE.to_string()),
            log_json: std::env::var("HERALD_LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HERALD_LOG_JSON must be true or false"))?,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn single_attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.single_attempt_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5299)),
            max_attempts: 5,
            connect_timeout_secs: 5,
            read_timeout_secs: 20,
            single_attempt_timeout_secs: 15,
            test_message: DEFAULT_TEST_MESSAGE.to_string(),
            log_json: false,
        }
    }
}
