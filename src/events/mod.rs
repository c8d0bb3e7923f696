//! Events module
//!
//! Inbound purchase lifecycle events from the invoicing subsystem and the
//! in-process queue that delivers them.

mod bus;
mod handler;

use serde::{Deserialize, Serialize};

use crate::domain::{ErrorKind, PurchaseEvent, PurchasePayload};

pub use bus::{ConsumerStats, EventBus, EventConsumer, EventPublisher, RetryPolicy};
pub use handler::PurchaseEventHandler;

/// Event handling errors
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for {name}: {source}")]
    MalformedPayload {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event queue is full")]
    QueueFull,

    #[error("Event queue is closed")]
    QueueClosed,
}

impl EventError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventError::UnknownEvent(_) | EventError::MalformedPayload { .. } => ErrorKind::Validation,
            EventError::QueueFull => ErrorKind::Collaborator,
            EventError::QueueClosed => ErrorKind::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EventError::UnknownEvent(_) => "unknown_event",
            EventError::MalformedPayload { .. } => "malformed_event_payload",
            EventError::QueueFull => "event_queue_full",
            EventError::QueueClosed => "event_queue_closed",
        }
    }
}

/// Event as it travels on the wire: a name plus an undecoded payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub name: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Decode into a typed event. The name is checked before the payload.
    pub fn decode(&self) -> Result<PurchaseEvent, EventError> {
        let build: fn(PurchasePayload) -> PurchaseEvent = match self.name.as_str() {
            "purchase_created" => PurchaseEvent::PurchaseCreated,
            "purchase_updated" => PurchaseEvent::PurchaseUpdated,
            "purchase_deleted" => PurchaseEvent::PurchaseDeleted,
            other => return Err(EventError::UnknownEvent(other.to_string())),
        };

        let payload: PurchasePayload =
            serde_json::from_value(self.payload.clone()).map_err(|source| {
                EventError::MalformedPayload {
                    name: self.name.clone(),
                    source,
                }
            })?;

        Ok(build(payload))
    }
}

impl TryFrom<&PurchaseEvent> for EventEnvelope {
    type Error = serde_json::Error;

    fn try_from(event: &PurchaseEvent) -> Result<Self, Self::Error> {
        Ok(Self::new(event.name(), serde_json::to_value(event.payload())?))
    }
}
