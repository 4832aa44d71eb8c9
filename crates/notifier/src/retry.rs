//! Per-destination delivery state machine.
//!
//! `Pending → Attempting(n) → Delivered | Attempting(n+1) | Failed`
//!
//! [`Delivery`] owns the attempt count and decides whether a failure is
//! retried; the dispatcher only performs the sends and sleeps it is told to.

use herald_common::types::{DeliveryState, Destination, DestinationOutcome};

use crate::error::DeliveryError;

/// Default number of attempts per destination, first try included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn single_attempt() -> Self {
        Self::new(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// What the dispatcher should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Back off for the given failed attempt (0-indexed) and try again.
    Retry { attempt: u32 },
    /// The destination reached `Failed`.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct Delivery {
    state: DeliveryState,
    attempts: u32,
    max_attempts: u32,
    status_code: Option<u16>,
    last_error: Option<DeliveryError>,
}

impl Delivery {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            state: DeliveryState::Pending,
            attempts: 0,
            max_attempts: policy.max_attempts,
            status_code: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&DeliveryError> {
        self.last_error.as_ref()
    }

    /// Move to the next attempt and return its 1-based number.
    ///
    /// Returns `None` once the delivery is terminal.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.state.is_terminal() {
            return None;
        }
        self.attempts += 1;
        self.state = DeliveryState::Attempting(self.attempts);
        Some(self.attempts)
    }

    pub fn succeed(&mut self, status_code: u16) {
        debug_assert!(matches!(self.state, DeliveryState::Attempting(_)));
        self.status_code = Some(status_code);
        self.last_error = None;
        self.state = DeliveryState::Delivered;
    }

    pub fn fail(&mut self, error: DeliveryError) -> Next {
        debug_assert!(matches!(self.state, DeliveryState::Attempting(_)));
        let attempt = self.attempts;
        let retryable = error.is_retryable();
        self.status_code = error.status_code();
        self.last_error = Some(error);

        if retryable && attempt < self.max_attempts {
            Next::Retry {
                attempt: attempt.saturating_sub(1),
            }
        } else {
            self.state = DeliveryState::Failed;
            Next::GiveUp
        }
    }

    pub fn into_outcome(self, destination: &Destination) -> DestinationOutcome {
        DestinationOutcome {
            platform: destination.platform.clone(),
            success: self.state == DeliveryState::Delivered,
            endpoint: destination.endpoint(),
            state: self.state,
            attempts: self.attempts(),
            status_code: self.status_code,
            error_kind: self.last_error.as_ref().map(DeliveryError::kind),
            error: self.last_error.as_ref().map(DeliveryError::summary),
        }
    }
}
