//! Built-in strategies for PIX, boleto, bank transfer and credit card.

use crate::domain::item::validate_amount;
use crate::domain::{Direction, DomainError, Money, TransactionType};

use super::TransactionStrategy;

/// Instant payment. Either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixStrategy;

impl TransactionStrategy for PixStrategy {
    fn kind(&self) -> TransactionType {
        TransactionType::Pix
    }

    fn validate(&self, amount: &Money, _direction: Direction, _paid: bool) -> Result<(), DomainError> {
        validate_amount(amount)
    }
}

/// Bank slip. Either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoletoStrategy;

impl TransactionStrategy for BoletoStrategy {
    fn kind(&self) -> TransactionType {
        TransactionType::Boleto
    }

    fn validate(&self, amount: &Money, _direction: Direction, _paid: bool) -> Result<(), DomainError> {
        validate_amount(amount)
    }
}

/// Bank transfer. Either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferStrategy;

impl TransactionStrategy for TransferStrategy {
    fn kind(&self) -> TransactionType {
        TransactionType::Transfer
    }

    fn validate(&self, amount: &Money, _direction: Direction, _paid: bool) -> Result<(), DomainError> {
        validate_amount(amount)
    }
}

/// Closed credit-card invoice total. Always an expense.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCardStrategy;

impl CreditCardStrategy {
    /// Title given to reconciled invoice items
    pub const ITEM_TITLE: &'static str = "Credit card invoice";

    /// A credit-card invoice can never be income
    pub fn ensure_expense(direction: Direction) -> Result<(), DomainError> {
        match direction {
            Direction::Expense => Ok(()),
            Direction::Income => Err(DomainError::CreditCardMustBeExpense),
        }
    }
}

impl TransactionStrategy for CreditCardStrategy {
    fn kind(&self) -> TransactionType {
        TransactionType::CreditCard
    }

    fn validate(&self, amount: &Money, direction: Direction, _paid: bool) -> Result<(), DomainError> {
        Self::ensure_expense(direction)?;
        validate_amount(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Currency;

    fn brl(minor: i64) -> Money {
        Money::new(minor, Currency::Brl)
    }

    #[test]
    fn test_plain_rails_accept_both_directions() {
        let strategies: [&dyn TransactionStrategy; 3] = [&PixStrategy, &BoletoStrategy, &TransferStrategy];
        for strategy in strategies {
            assert!(strategy.validate(&brl(100), Direction::Income, false).is_ok());
            assert!(strategy.validate(&brl(100), Direction::Expense, true).is_ok());
            assert!(matches!(
                strategy.validate(&brl(0), Direction::Expense, false),
                Err(DomainError::InvalidAmount(_))
            ));
        }
    }

    #[test]
    fn test_credit_card_requires_expense() {
        let strategy = CreditCardStrategy;
        assert!(strategy.validate(&brl(25_000), Direction::Expense, false).is_ok());
        assert_eq!(
            strategy.validate(&brl(25_000), Direction::Income, false),
            Err(DomainError::CreditCardMustBeExpense)
        );
    }

    #[test]
    fn test_credit_card_rejects_non_positive_amount() {
        let strategy = CreditCardStrategy;
        assert!(matches!(
            strategy.validate(&brl(-1), Direction::Expense, false),
            Err(DomainError::InvalidAmount(_))
        ));
    }
}
