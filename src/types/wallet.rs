//! Company wallet
//!
//! The single balance funding every card charge and wallet-sourced invoice
//! payment. Debits use checked arithmetic and never take the balance below zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub balance: Decimal,
}

impl Wallet {
    pub fn new(balance: Decimal) -> Self {
        Wallet { balance }
    }

    /// Add funds
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("wallet credit"))?;
        Ok(self.balance)
    }

    /// Remove funds, refusing to go negative
    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if self.balance < amount {
            return Err(LedgerError::insufficient_funds(self.balance, amount));
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("wallet debit"))?;
        Ok(self.balance)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}
