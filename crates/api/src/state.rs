//! Shared application state for the Axum API server.

use std::sync::Arc;

use herald_common::config::AppConfig;
use herald_notifier::{Dispatcher, HttpTransport, RetryPolicy, Timeouts};

/// Application state shared across all route handlers via Axum `State`.
///
/// Holds no per-request data: every call builds its own destinations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Retrying dispatcher (connect/read timeouts)
    pub dispatcher: Arc<Dispatcher>,
    /// Single-attempt dispatcher (one combined timeout)
    pub single: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, dispatcher: Dispatcher, single: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            single: Arc::new(single),
        }
    }

    /// Build both dispatchers with HTTP transports configured from `config`.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let retrying = HttpTransport::new(Timeouts::Split {
            connect: config.connect_timeout(),
            read: config.read_timeout(),
        })?;
        let single = HttpTransport::new(Timeouts::Total(config.single_attempt_timeout()))?;

        let dispatcher = Dispatcher::new(Arc::new(retrying), RetryPolicy::new(config.max_attempts));
        let single = Dispatcher::new(Arc::new(single), RetryPolicy::single_attempt());

        Ok(Self::new(config, dispatcher, single))
    }
}
