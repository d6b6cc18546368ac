//! Error types for the card ledger
//!
//! This module defines every failure a ledger operation can report. Declined
//! charges are deliberately absent: a decline is a normal authorization outcome
//! (see [`crate::core::authorizer::Authorization`]), not an error.
//!
//! # Error Categories
//!
//! - **Validation**: malformed or out-of-range input, detected before any mutation
//! - **Not Found**: a referenced card, invoice, approval, payment or transaction is absent
//! - **Conflict**: a business rule forbids the operation (locked invoice, method lock, ...)
//! - **Insufficient Funds**: a wallet debit would take the balance below zero
//! - **Persistence**: the store could not complete the operation
//! - **Arithmetic**: a balance or spend computation would overflow

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the card ledger
///
/// Every variant carries enough context for the HTTP layer to render a
/// distinct message without re-reading the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Input rejected before touching the store
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the offending input
        message: String,
    },

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind ("Card", "Invoice", ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: u64,
    },

    /// Business rule violation
    ///
    /// `blocked_fields` lists every rejected field name when the conflict comes
    /// from a field allow-list check, and is empty otherwise.
    #[error("{message}")]
    Conflict {
        /// Explanation shown to the caller
        message: String,
        /// Field names rejected by an allow-list check
        blocked_fields: Vec<String>,
    },

    /// Wallet debit larger than the current balance
    #[error("Insufficient wallet funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Wallet balance at the time of the check
        available: Decimal,
        /// Amount that was requested
        requested: Decimal,
    },

    /// Store failure (poisoned lock, unavailable backend)
    #[error("Persistence error: {message}")]
    Persistence {
        /// Description of the store failure
        message: String,
    },

    /// Checked decimal arithmetic overflowed
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },
}

impl LedgerError {
    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        LedgerError::NotFound { entity, id }
    }

    /// Create a Conflict error without blocked fields
    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict {
            message: message.into(),
            blocked_fields: Vec::new(),
        }
    }

    /// Create a Conflict error listing the fields an allow-list rejected
    pub fn blocked_fields(message: impl Into<String>, fields: Vec<String>) -> Self {
        LedgerError::Conflict {
            message: message.into(),
            blocked_fields: fields,
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            available,
            requested,
        }
    }

    /// Create a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        LedgerError::Persistence {
            message: message.into(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Short machine-readable category used in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "validation",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Conflict { .. } => "conflict",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::Persistence { .. } => "persistence",
            LedgerError::ArithmeticOverflow { .. } => "arithmetic_overflow",
        }
    }
}

/// Reject zero and negative amounts
pub fn require_positive(amount: Decimal, what: &str) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "{} must be greater than zero, got {}",
            what, amount
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::validation(
        LedgerError::validation("amount must be positive"),
        "Validation error: amount must be positive"
    )]
    #[case::not_found(LedgerError::not_found("Card", 7), "Card 7 not found")]
    #[case::conflict(
        LedgerError::conflict("payment method locked to ach"),
        "payment method locked to ach"
    )]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds(Decimal::new(10000, 2), Decimal::new(15000, 2)),
        "Insufficient wallet funds: available 100.00, requested 150.00"
    )]
    #[case::persistence(
        LedgerError::persistence("wallet lock poisoned"),
        "Persistence error: wallet lock poisoned"
    )]
    #[case::overflow(
        LedgerError::arithmetic_overflow("card spend"),
        "Arithmetic overflow in card spend"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_blocked_fields_carries_field_names() {
        let error = LedgerError::blocked_fields(
            "Invoice is locked",
            vec!["amount".to_string(), "vendorName".to_string()],
        );
        match error {
            LedgerError::Conflict { blocked_fields, .. } => {
                assert_eq!(blocked_fields, vec!["amount", "vendorName"]);
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[rstest]
    #[case::zero(Decimal::ZERO, false)]
    #[case::negative(Decimal::new(-1, 0), false)]
    #[case::positive(Decimal::new(1, 2), true)]
    fn test_require_positive(#[case] amount: Decimal, #[case] ok: bool) {
        assert_eq!(require_positive(amount, "amount").is_ok(), ok);
    }
}
