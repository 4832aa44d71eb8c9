//! Herald HTTP API.
//!
//! Endpoints:
//! - GET  /health: liveness
//! - POST /test-notification: send the configured test message to every enabled destination
//! - POST /notify: send a caller-supplied message, with retries
//! - POST /notify/once: send a caller-supplied message, one attempt per destination

pub mod routes;
pub mod state;
