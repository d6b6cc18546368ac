//! Card Ledger Library
//! # Overview
//!
//! This library implements a virtual-card and accounts-payable ledger: cards
//! funded from a single company wallet, invoices paid by card, ACH or check,
//! and the transaction coding that feeds an ERP export.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Card, Invoice, Transaction, Payment, Wallet, etc.)
//! - [`cli`] - Server configuration parsing
//! - [`core`] - Business logic components:
//!   - [`core::traits`] - The `LedgerStore` persistence boundary
//!   - [`core::ledger_store`] - DashMap-backed in-memory store
//!   - [`core::card_lifecycle`] - Card status transitions and credential issuance
//!   - [`core::authorizer`] - Charge authorization against card limits and the wallet
//!   - [`core::invoice_payments`] - Paying invoices by card, shared card, ACH or check
//!   - [`core::approval_workflow`] - Card approvals
//! - [`io`] - CSV export and coding import
//! - [`api`] - axum REST surface
//!
//! # Card Lifecycle
//!
//! - **Pending Approval**: created by a request, waiting on an approver
//! - **Active**: credentials issued, charges are authorized
//! - **Locked**: temporarily frozen, can be unlocked
//! - **Suspended**: retired; blocked while it backs an invoice with spend
//! - **Rejected**: the approver declined the request
//!
//! # Charge Authorization
//!
//! Each charge is decided under the card's and the wallet's locks: card status,
//! validity window and restrictions, wallet funds, recurring resets and the
//! spend limit. A decline is a normal result and leaves nothing behind.

pub mod api;
pub mod cli;
pub mod core;
pub mod io;
pub mod types;

pub use core::{
    Authorization, ChargeRequest, DeclineReason, InMemoryLedger, Ledger, LedgerConfig,
    LedgerStore,
};
pub use io::write_transactions_csv;
pub use types::{Card, CardStatus, Invoice, LedgerError, Payment, Transaction, Wallet};
