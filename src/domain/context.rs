//! Operation Context
//!
//! Metadata about the current operation, carried into use-case log spans.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSource {
    Api,
    Event,
    Internal,
}

/// Context for an operation, used for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// User ID from X-Request-User-Id header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user_id: Option<Uuid>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    pub source: OperationSource,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new(source: OperationSource) -> Self {
        Self {
            request_user_id: None,
            correlation_id: None,
            source,
        }
    }

    /// Context for a purchase event delivery
    pub fn for_event() -> Self {
        let mut context = Self::new(OperationSource::Event);
        context.ensure_correlation_id();
        context
    }

    /// Create context with request user ID
    pub fn with_request_user(mut self, user_id: Uuid) -> Self {
        self.request_user_id = Some(user_id);
        self
    }

    /// Create context with correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new(OperationSource::Internal)
    }
}
