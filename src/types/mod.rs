//! Types module
//!
//! Contains the ledger's data structures, organised by entity:
//! - `card`: cards, lifecycle status, limits and restrictions
//! - `approval`: card approval records
//! - `invoice`: invoices, payment terms and payment methods
//! - `transaction`: posted charges and their derived status
//! - `payment`: AP installments and invoice status derivation
//! - `wallet`: the company wallet
//! - `error`: error types for the ledger

pub mod approval;
pub mod card;
pub mod error;
pub mod invoice;
pub mod payment;
pub mod transaction;
pub mod wallet;

pub use approval::{
    ApprovalDecision, ApprovalId, ApprovalStatus, CardApproval, NewApproval, PendingApproval,
};
pub use card::{
    Card, CardCredentials, CardId, CardStatus, CardUpdate, ChannelRestriction, LimitType,
    NewCard, RenewalFrequency, TransactionCount,
};
pub use error::{require_positive, LedgerError};
pub use invoice::{
    CardDefaults, Invoice, InvoiceId, InvoiceStatus, InvoiceUpdate, NewInvoice, PaymentMethod,
    PaymentTerms,
};
pub use payment::{
    derive_invoice_status, paid_total, NewPayment, Payment, PaymentId, PaymentStatus,
    PaymentUpdate,
};
pub use transaction::{
    NewTransaction, Transaction, TransactionCoding, TransactionId, TransactionStatus,
};
pub use wallet::Wallet;
