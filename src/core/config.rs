//! Ledger configuration

use clap::ValueEnum;
use rust_decimal::Decimal;

/// Whether the authorizer acts on the one-time-card auto-suspend predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AutoSuspendPolicy {
    /// Report the predicate only; cards stay Active
    #[default]
    Advisory,
    /// Suspend a qualifying card inside the charge that exhausts it
    Enforce,
}

/// Configuration consumed by the ledger services
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Wallet balance the store starts with
    pub opening_balance: Decimal,
    pub auto_suspend: AutoSuspendPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            opening_balance: Decimal::ZERO,
            auto_suspend: AutoSuspendPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Create a config, falling back to defaults for invalid values
    pub fn new(opening_balance: Decimal, auto_suspend: AutoSuspendPolicy) -> Self {
        let default = Self::default();

        let opening_balance = if opening_balance < Decimal::ZERO {
            tracing::warn!(
                "Invalid opening balance ({}), using default ({})",
                opening_balance,
                default.opening_balance
            );
            default.opening_balance
        } else {
            opening_balance
        };

        Self {
            opening_balance,
            auto_suspend,
        }
    }
}
