//! Transaction types
//!
//! A transaction is a posted charge against a card, or the ledger entry of an
//! ACH/check invoice payment. Its status is never set directly: it is a pure
//! function of the row's receipt, coding and sync facts, recomputed by the
//! store on every write.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::card::CardId;
use super::invoice::{InvoiceId, PaymentMethod};

/// Transaction identifier
pub type TransactionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "Pending Receipt")]
    PendingReceipt,
    #[serde(rename = "Pending Coding")]
    PendingCoding,
    #[serde(rename = "Ready to Sync")]
    ReadyToSync,
    Synced,
    /// Settled ACH/check payment entry
    Approved,
}

impl TransactionStatus {
    /// Derive the status of a row from its facts
    ///
    /// A missing receipt always wins: coding completeness is only considered
    /// once a receipt is attached, and only a Ready-to-Sync row can be Synced.
    pub fn derive(
        method: PaymentMethod,
        has_receipt: bool,
        has_coding: bool,
        synced: bool,
    ) -> Self {
        if method != PaymentMethod::Card {
            return TransactionStatus::Approved;
        }
        match (has_receipt, has_coding, synced) {
            (false, _, _) => TransactionStatus::PendingReceipt,
            (true, false, _) => TransactionStatus::PendingCoding,
            (true, true, true) => TransactionStatus::Synced,
            (true, true, false) => TransactionStatus::ReadyToSync,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransactionStatus::PendingReceipt => "Pending Receipt",
            TransactionStatus::PendingCoding => "Pending Coding",
            TransactionStatus::ReadyToSync => "Ready to Sync",
            TransactionStatus::Synced => "Synced",
            TransactionStatus::Approved => "Approved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub card_id: Option<CardId>,
    pub invoice_id: Option<InvoiceId>,
    pub amount: Decimal,
    pub vendor_name: String,
    pub transaction_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub gl_account: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub memo: Option<String>,
    pub receipt_url: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn from_new(id: TransactionId, new: NewTransaction, now: DateTime<Utc>) -> Self {
        let mut transaction = Transaction {
            id,
            card_id: new.card_id,
            invoice_id: new.invoice_id,
            amount: new.amount,
            vendor_name: new.vendor_name,
            transaction_date: now,
            payment_method: new.payment_method,
            status: TransactionStatus::PendingReceipt,
            gl_account: new.gl_account,
            department: new.department,
            cost_center: new.cost_center,
            memo: new.memo,
            receipt_url: None,
            synced_at: None,
        };
        transaction.refresh_status();
        transaction
    }

    pub fn has_receipt(&self) -> bool {
        is_filled(&self.receipt_url)
    }

    /// GL account, department and cost center are all present
    pub fn has_coding(&self) -> bool {
        is_filled(&self.gl_account) && is_filled(&self.department) && is_filled(&self.cost_center)
    }

    /// Recompute `status` from the row's facts
    pub fn refresh_status(&mut self) {
        self.status = TransactionStatus::derive(
            self.payment_method,
            self.has_receipt(),
            self.has_coding(),
            self.synced_at.is_some(),
        );
    }
}

fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Row to insert; the store assigns id, date and status
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub card_id: Option<CardId>,
    pub invoice_id: Option<InvoiceId>,
    pub amount: Decimal,
    pub vendor_name: String,
    pub payment_method: PaymentMethod,
    pub gl_account: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub memo: Option<String>,
}

/// Coding and receipt attached after posting
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionCoding {
    pub gl_account: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
    pub memo: Option<String>,
    pub receipt_url: Option<String>,
}

impl TransactionCoding {
    pub fn apply(self, transaction: &mut Transaction) {
        if let Some(v) = self.gl_account {
            transaction.gl_account = Some(v);
        }
        if let Some(v) = self.department {
            transaction.department = Some(v);
        }
        if let Some(v) = self.cost_center {
            transaction.cost_center = Some(v);
        }
        if let Some(v) = self.memo {
            transaction.memo = Some(v);
        }
        if let Some(v) = self.receipt_url {
            transaction.receipt_url = Some(v);
        }
    }
}
