//! Core business logic module
//!
//! This module contains the ledger's components:
//! - `traits` - The `LedgerStore` persistence boundary and its units of work
//! - `ledger_store` - DashMap-backed in-memory store
//! - `config` - Ledger configuration and the auto-suspend policy
//! - `card_lifecycle` - Card status transitions and their side effects
//! - `authorizer` - Charge authorization against cards and the wallet
//! - `invoice_ledger` - Invoice records, the invoice-lock rule and status derivation
//! - `invoice_payments` - Card, shared-card, ACH and check invoice payments
//! - `approval_workflow` - Pending approvals and decisions
//! - `transaction_ledger` - Coding, receipts and ERP sync
//! - `wallet_manager` - Wallet funding and debits
//! - `reports` - Spend summaries
//! - `ledger` - All services wired to one store

pub mod approval_workflow;
pub mod authorizer;
pub mod card_lifecycle;
pub mod config;
pub mod invoice_ledger;
pub mod invoice_payments;
pub mod ledger;
pub mod ledger_store;
pub mod reports;
pub mod traits;
pub mod transaction_ledger;
pub mod wallet_manager;

pub use approval_workflow::ApprovalWorkflow;
pub use authorizer::{
    ApprovedCharge, Authorization, ChargeChannel, ChargeRequest, DeclineReason,
    TransactionAuthorizer,
};
pub use card_lifecycle::{evaluate_auto_suspend, AutoSuspendReason, CardLifecycleManager};
pub use config::{AutoSuspendPolicy, LedgerConfig};
pub use invoice_ledger::InvoiceLedger;
pub use invoice_payments::{
    BankPayment, CardPaymentOutcome, FundingSource, InvoiceCardSpec, InvoicePaymentOrchestrator,
};
pub use ledger::Ledger;
pub use ledger_store::InMemoryLedger;
pub use reports::LedgerSummary;
pub use traits::{ChargeUnit, LedgerStore, Settlement, SettlementUnit};
pub use transaction_ledger::TransactionLedger;
pub use wallet_manager::WalletManager;
