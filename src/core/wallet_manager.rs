//! Wallet management module
//!
//! This module provides the `WalletManager` struct, which funds and debits the
//! company wallet outside of card charges and invoice settlements.
//!
//! Funding and debiting are separate operations with separate validation:
//! - `fund` accepts only positive amounts
//! - `debit` accepts only positive amounts and never overdraws
//! - `add_funds` keeps the signed-amount contract of the add-funds route,
//!   sending negative amounts through the guarded debit path

use rust_decimal::Decimal;
use std::sync::Arc;

use super::traits::LedgerStore;
use crate::types::{require_positive, LedgerError, Wallet};

#[derive(Debug)]
pub struct WalletManager<S> {
    store: Arc<S>,
}

impl<S> Clone for WalletManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> WalletManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Current wallet snapshot
    pub fn wallet(&self) -> Result<Wallet, LedgerError> {
        self.store.wallet()
    }

    /// Add funds to the wallet
    ///
    /// # Arguments
    ///
    /// * `amount` - Amount to add; must be greater than zero
    ///
    /// # Returns
    ///
    /// The wallet balance after funding
    pub fn fund(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = require_positive(amount, "amount")?;
        let balance = self.store.update_wallet(|wallet| wallet.credit(amount))?;
        tracing::info!(amount = %amount, balance = %balance, "Wallet funded");
        Ok(balance)
    }

    /// Remove funds from the wallet, refusing to overdraw
    pub fn debit(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = require_positive(amount, "amount")?;
        let balance = self.store.update_wallet(|wallet| wallet.debit(amount))?;
        tracing::info!(amount = %amount, balance = %balance, "Wallet debited");
        Ok(balance)
    }

    /// Signed adjustment: positive amounts fund, negative amounts debit
    pub fn add_funds(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::validation("amount must not be zero"));
        }
        if amount.is_sign_negative() {
            self.debit(-amount)
        } else {
            self.fund(amount)
        }
    }
}
