//! Event Bus
//!
//! Bounded in-process queue between event publishers (the HTTP edge, or an
//! adapter in front of a broker) and the single consumer task.
//!
//! The HTTP publisher never learns how handling went, so the consumer owns
//! redelivery: collaborator failures are retried with exponential backoff up
//! to a fixed number of attempts. Retries run in place, so events are always
//! handled in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::{ErrorKind, OperationContext};
use crate::error::AppError;

use super::{EventEnvelope, EventError, PurchaseEventHandler};

pub struct EventBus;

impl EventBus {
    /// Create a bounded queue
    pub fn channel(capacity: usize) -> (EventPublisher, EventConsumer) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            EventPublisher { sender },
            EventConsumer {
                receiver,
                retry: RetryPolicy::default(),
            },
        )
    }
}

/// Sending half; clones share the queue
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: mpsc::Sender<EventEnvelope>,
}

impl EventPublisher {
    /// Enqueue without waiting. A full queue is reported, not awaited.
    pub fn publish(&self, envelope: EventEnvelope) -> Result<(), EventError> {
        self.sender.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => EventError::QueueFull,
            TrySendError::Closed(_) => EventError::QueueClosed,
        })
    }

    /// Enqueue, waiting for room
    pub async fn publish_wait(&self, envelope: EventEnvelope) -> Result<(), EventError> {
        self.sender
            .send(envelope)
            .await
            .map_err(|_| EventError::QueueClosed)
    }
}

/// How the consumer redelivers an event whose handling failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per event, the first delivery included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Only collaborator failures can succeed on a later attempt. Bad input
    /// and invariant violations fail the same way every time.
    pub fn should_retry(&self, error: &AppError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.kind() == ErrorKind::Collaborator
    }

    /// Wait before the attempt following failed attempt number `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Counters reported when the consumer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub handled: u64,
    /// Events dropped after their last attempt
    pub failed: u64,
    /// Redeliveries, across all events
    pub retried: u64,
}

/// Receiving half
#[derive(Debug)]
pub struct EventConsumer {
    receiver: mpsc::Receiver<EventEnvelope>,
    retry: RetryPolicy,
}

impl EventConsumer {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start consuming in the background
    pub fn start(self, handler: PurchaseEventHandler) -> tokio::task::JoinHandle<ConsumerStats> {
        tokio::spawn(async move { self.run(handler).await })
    }

    /// Handle events one at a time until every publisher is dropped
    pub async fn run(mut self, handler: PurchaseEventHandler) -> ConsumerStats {
        tracing::info!(max_attempts = self.retry.max_attempts, "Event consumer started");
        let mut stats = ConsumerStats::default();

        while let Some(envelope) = self.receiver.recv().await {
            let context = OperationContext::for_event();
            let mut attempt = 1;

            loop {
                match handler.handle_envelope(&envelope, &context).await {
                    Ok(_) => {
                        stats.handled += 1;
                        break;
                    }
                    Err(e) if self.retry.should_retry(&e, attempt) => {
                        let delay = self.retry.delay_for(attempt);
                        stats.retried += 1;
                        tracing::warn!(
                            event = %envelope.name,
                            correlation_id = ?context.correlation_id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Event handling failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::error!(
                            event = %envelope.name,
                            correlation_id = ?context.correlation_id,
                            attempts = attempt,
                            kind = e.kind().as_str(),
                            error = %e,
                            "Event handling failed"
                        );
                        break;
                    }
                }
            }
        }

        tracing::info!(
            handled = stats.handled,
            failed = stats.failed,
            retried = stats.retried,
            "Event consumer stopped"
        );
        stats
    }
}
