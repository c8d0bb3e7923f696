//! Purchase Events
//!
//! Lifecycle events published by the invoicing module whenever a card
//! purchase changes. Each one names the months whose closed invoices may have
//! moved.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReferenceMonth;

/// Payload shared by every purchase lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePayload {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub affected_months: Vec<ReferenceMonth>,
}

/// Purchase lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "snake_case")]
pub enum PurchaseEvent {
    PurchaseCreated(PurchasePayload),
    PurchaseUpdated(PurchasePayload),
    PurchaseDeleted(PurchasePayload),
}

impl PurchaseEvent {
    pub const NAMES: [&'static str; 3] = ["purchase_created", "purchase_updated", "purchase_deleted"];

    /// Get the event name as published
    pub fn name(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseCreated(_) => "purchase_created",
            PurchaseEvent::PurchaseUpdated(_) => "purchase_updated",
            PurchaseEvent::PurchaseDeleted(_) => "purchase_deleted",
        }
    }

    pub fn payload(&self) -> &PurchasePayload {
        match self {
            PurchaseEvent::PurchaseCreated(payload)
            | PurchaseEvent::PurchaseUpdated(payload)
            | PurchaseEvent::PurchaseDeleted(payload) => payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let user_id = Uuid::new_v4();
        let category_id = Uuid::new_v4();
        let json = serde_json::json!({
            "name": "purchase_created",
            "payload": {
                "user_id": user_id,
                "category_id": category_id,
                "affected_months": ["2025-02", "2025-03"]
            }
        });

        let event: PurchaseEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.name(), "purchase_created");
        assert_eq!(event.payload().user_id, user_id);
        assert_eq!(event.payload().affected_months.len(), 2);
        assert_eq!(event.payload().affected_months[0].to_string(), "2025-02");
    }

    #[test]
    fn test_names_match_variants() {
        let payload = PurchasePayload {
            user_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            affected_months: vec![],
        };
        let events = [
            PurchaseEvent::PurchaseCreated(payload.clone()),
            PurchaseEvent::PurchaseUpdated(payload.clone()),
            PurchaseEvent::PurchaseDeleted(payload),
        ];
        for (event, name) in events.iter().zip(PurchaseEvent::NAMES) {
            assert_eq!(event.name(), name);
        }
    }
}
