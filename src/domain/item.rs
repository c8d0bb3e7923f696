//! Transaction items
//!
//! A single dated monetary movement inside a monthly ledger. Items validate
//! themselves in isolation; cross-item rules live in the aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{DomainError, Money};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Whether the movement adds to or subtracts from the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Income,
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "INCOME",
            Direction::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Direction::Income),
            "EXPENSE" => Ok(Direction::Expense),
            _ => Err(DomainError::InvalidDirection(s.to_string())),
        }
    }
}

/// Payment rail of the movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Pix,
    Boleto,
    Transfer,
    CreditCard,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Pix,
        TransactionType::Boleto,
        TransactionType::Transfer,
        TransactionType::CreditCard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Pix => "PIX",
            TransactionType::Boleto => "BOLETO",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::CreditCard => "CREDIT_CARD",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PIX" => Ok(TransactionType::Pix),
            "BOLETO" => Ok(TransactionType::Boleto),
            "TRANSFER" => Ok(TransactionType::Transfer),
            "CREDIT_CARD" => Ok(TransactionType::CreditCard),
            _ => Err(DomainError::InvalidTransactionType(s.to_string())),
        }
    }
}

/// Lifecycle of an item. One way: Active -> Deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl ItemState {
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ItemState::Active => None,
            ItemState::Deleted { at } => Some(*at),
        }
    }
}

/// Fields needed to create an item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub monthly_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Money,
    pub direction: Direction,
    pub kind: TransactionType,
    pub paid: bool,
}

/// Partial update of an item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub direction: Option<Direction>,
    pub paid: Option<bool>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self == &ItemChanges::default()
    }
}

/// A monetary movement owned by exactly one monthly ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionItem {
    id: Uuid,
    monthly_id: Uuid,
    category_id: Uuid,
    title: String,
    description: Option<String>,
    amount: Money,
    direction: Direction,
    kind: TransactionType,
    paid: bool,
    state: ItemState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Validate the fields and build a fresh, active item.
    pub fn create(id: Uuid, fields: NewItem) -> Result<Self, DomainError> {
        let title = validate_title(&fields.title)?;
        let description = validate_description(fields.description)?;
        validate_amount(&fields.amount)?;

        let now = Utc::now();
        Ok(Self {
            id,
            monthly_id: fields.monthly_id,
            category_id: fields.category_id,
            title,
            description,
            amount: fields.amount,
            direction: fields.direction,
            kind: fields.kind,
            paid: fields.paid,
            state: ItemState::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuild an item from storage. No validation: rows were valid when written.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid,
        monthly_id: Uuid,
        category_id: Uuid,
        title: String,
        description: Option<String>,
        amount: Money,
        direction: Direction,
        kind: TransactionType,
        paid: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            monthly_id,
            category_id,
            title,
            description,
            amount,
            direction,
            kind,
            paid,
            state: match deleted_at {
                Some(at) => ItemState::Deleted { at },
                None => ItemState::Active,
            },
            created_at,
            updated_at,
        }
    }

    /// Apply a partial update. Either every change is applied or none is.
    pub fn update(&mut self, changes: ItemChanges) -> Result<(), DomainError> {
        let title = match changes.title {
            Some(title) => validate_title(&title)?,
            None => self.title.clone(),
        };
        let description = match changes.description {
            Some(description) => validate_description(Some(description))?,
            None => self.description.clone(),
        };
        let amount = changes.amount.unwrap_or(self.amount);
        validate_amount(&amount)?;

        self.title = title;
        self.description = description;
        self.amount = amount;
        if let Some(category_id) = changes.category_id {
            self.category_id = category_id;
        }
        if let Some(direction) = changes.direction {
            self.direction = direction;
        }
        if let Some(paid) = changes.paid {
            self.paid = paid;
        }
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Soft delete. Deleting an already deleted item keeps the first tombstone.
    pub fn delete(&mut self, at: DateTime<Utc>) {
        if self.is_active() {
            self.state = ItemState::Deleted { at };
            self.updated_at = at;
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn monthly_id(&self) -> Uuid {
        self.monthly_id
    }

    pub fn category_id(&self) -> Uuid {
        self.category_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn is_paid(&self) -> bool {
        self.paid
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ItemState::Active
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.state.deleted_at()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::InvalidTitle("title is required".to_string()));
    }
    let chars = title.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(DomainError::InvalidTitle(format!(
            "title must be at most {MAX_TITLE_CHARS} characters (got {chars})"
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, DomainError> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description = description.trim();
    if description.is_empty() {
        return Ok(None);
    }
    let chars = description.chars().count();
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(DomainError::InvalidDescription(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters (got {chars})"
        )));
    }
    Ok(Some(description.to_string()))
}

/// Base amount rule shared by every transaction type
pub(crate) fn validate_amount(amount: &Money) -> Result<(), DomainError> {
    if !amount.is_positive() {
        return Err(DomainError::InvalidAmount(format!(
            "amount must be positive (got {amount})"
        )));
    }
    Ok(())
}
