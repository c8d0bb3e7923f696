//! Keyset pagination cursor
//!
//! Opaque to clients: base64url (no padding) over the JSON of the last row's
//! sort key. Pages are ordered by `(reference_month DESC, id DESC)`.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::domain::ReferenceMonth;

use super::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCursor {
    pub reference_month: ReferenceMonth,
    pub id: Uuid,
}

impl MonthlyCursor {
    pub fn new(reference_month: ReferenceMonth, id: Uuid) -> Self {
        Self { reference_month, id }
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| StoreError::InvalidCursor("unencodable monthly cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn decode(input: &str) -> Result<Self, StoreError> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| StoreError::InvalidCursor("invalid monthly cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| StoreError::InvalidCursor("invalid monthly cursor".to_string()))
    }

    /// Order of a row in the listing: newest month first, ties by id descending
    pub fn listing_order(&self, other: &Self) -> Ordering {
        other
            .reference_month
            .cmp(&self.reference_month)
            .then_with(|| other.id.cmp(&self.id))
    }

    /// Whether a row with this key comes strictly after `cursor` in the listing
    pub fn is_after(&self, cursor: &MonthlyCursor) -> bool {
        self.listing_order(cursor) == Ordering::Greater
    }
}
