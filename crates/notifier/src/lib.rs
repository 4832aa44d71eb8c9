//! Notification delivery.
//!
//! Takes a [`DispatchRequest`](herald_common::types::DispatchRequest), formats the
//! message per destination and posts it to each webhook:
//! - bounded retries with jittered exponential backoff (`2^n + U(0,1)` seconds)
//! - failures classified as timeout / TLS / connection / HTTP status
//! - single-attempt mode for interactive "test this config" calls
//! - aggregate success only when every destination is delivered

pub mod backoff;
pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod transport;

pub use backoff::{Backoff, ExponentialBackoff, NoBackoff};
pub use dispatcher::Dispatcher;
pub use error::DeliveryError;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Timeouts, Transport};
