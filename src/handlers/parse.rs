//! Input parsing shared by the command handlers. Runs before a transaction is
//! opened, so bad input never touches storage.

use uuid::Uuid;

use crate::domain::{Currency, DomainError, Money};
use crate::error::{AppError, AppResult};

pub(crate) fn parse_uuid(field: &str, value: &str) -> AppResult<Uuid> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("{} must be a UUID, got '{}'", field, value)))
}

pub(crate) fn parse_amount(value: &str, currency: Currency) -> AppResult<Money> {
    Money::parse_decimal(value, currency)
        .map_err(|e| AppError::Domain(DomainError::InvalidAmount(e.to_string())))
}

pub(crate) fn required<'a>(field: &str, value: Option<&'a str>) -> AppResult<&'a str> {
    value.ok_or_else(|| AppError::InvalidRequest(format!("{} is required", field)))
}
