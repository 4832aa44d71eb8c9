//! Dispatch pass: format and deliver one message to every destination.
//!
//! Destinations are processed one after another in configuration order. Each
//! destination runs its full attempt/backoff cycle before the next starts, and
//! the pass succeeds only if every destination ends `Delivered`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use herald_common::types::{Destination, DestinationOutcome, DispatchReport, DispatchRequest};
use herald_formatter::Payload;

use crate::backoff::{Backoff, ExponentialBackoff};
use crate::retry::{Delivery, Next, RetryPolicy};
use crate::transport::Transport;

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    backoff: Arc<dyn Backoff>,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Dispatcher with jittered exponential backoff.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            backoff: Arc::new(ExponentialBackoff::default()),
            policy,
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Deliver `request.message` to every destination with retries.
    pub async fn dispatch(&self, request: &DispatchRequest) -> DispatchReport {
        self.run(request, self.policy).await
    }

    /// Deliver `request.message` to every destination, one attempt each.
    ///
    /// Failures are reported with their classified cause instead of retried.
    pub async fn dispatch_once(&self, request: &DispatchRequest) -> DispatchReport {
        self.run(request, RetryPolicy::single_attempt()).await
    }

    /// Format and deliver to a single destination with retries.
    pub async fn deliver(&self, destination: &Destination, message: &str) -> DestinationOutcome {
        let payload = herald_formatter::format(destination, message);
        self.deliver_payload(destination, &payload, self.policy).await
    }

    /// Format and deliver to a single destination with exactly one attempt.
    pub async fn deliver_once(
        &self,
        destination: &Destination,
        message: &str,
    ) -> DestinationOutcome {
        let payload = herald_formatter::format(destination, message);
        self.deliver_payload(destination, &payload, RetryPolicy::single_attempt())
            .await
    }

    async fn run(&self, request: &DispatchRequest, policy: RetryPolicy) -> DispatchReport {
        let id = Uuid::new_v4();
        let started_at = Utc::now();

        tracing::info!(
            dispatch_id = %id,
            destinations = request.destinations.len(),
            max_attempts = policy.max_attempts,
            "Dispatch pass started"
        );

        let mut outcomes = Vec::with_capacity(request.destinations.len());
        for destination in &request.destinations {
            let payload = herald_formatter::format(destination, &request.message);
            outcomes.push(self.deliver_payload(destination, &payload, policy).await);
        }

        let report = DispatchReport::new(id, outcomes, started_at, Utc::now());

        if report.success {
            tracing::info!(
                dispatch_id = %id,
                summary = %report.summary(),
                "Dispatch pass finished"
            );
        } else {
            for failed in report.failed() {
                tracing::error!(
                    dispatch_id = %id,
                    platform = %failed.platform,
                    endpoint = %failed.endpoint,
                    attempts = failed.attempts,
                    error = failed.error.as_deref().unwrap_or_default(),
                    "Destination failed"
                );
            }
            tracing::warn!(dispatch_id = %id, summary = %report.summary(), "Dispatch pass failed");
        }

        report
    }

    async fn deliver_payload(
        &self,
        destination: &Destination,
        payload: &Payload,
        policy: RetryPolicy,
    ) -> DestinationOutcome {
        let mut delivery = Delivery::new(policy);

        while let Some(attempt) = delivery.begin_attempt() {
            match self.transport.send(destination, payload).await {
                Ok(status) => {
                    tracing::info!(
                        platform = %destination.platform,
                        endpoint = %destination.endpoint(),
                        status,
                        attempt,
                        raw = payload.is_raw(),
                        "Notification delivered"
                    );
                    delivery.succeed(status);
                }
                Err(err) => {
                    tracing::error!(
                        platform = %destination.platform,
                        endpoint = %destination.endpoint(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        kind = %err.kind(),
                        error = %err,
                        "Delivery attempt failed"
                    );

                    match delivery.fail(err) {
                        Next::Retry { attempt } => {
                            let delay = self.backoff.delay(attempt);
                            tracing::warn!(
                                platform = %destination.platform,
                                delay_ms = delay.as_millis() as u64,
                                "Retrying delivery"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        Next::GiveUp => {
                            if policy.max_attempts > 1 {
                                tracing::error!(
                                    platform = %destination.platform,
                                    endpoint = %destination.endpoint(),
                                    attempts = delivery.attempts(),
                                    "Giving up on destination"
                                );
                            }
                        }
                    }
                }
            }
        }

        delivery.into_outcome(destination)
    }
}
