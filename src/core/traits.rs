//! Persistence boundary for the ledger
//!
//! This module defines the `LedgerStore` trait every service is written
//! against, plus the two units of work that must commit several rows as one:
//! a card charge (card + wallet + transaction row) and a wallet-funded invoice
//! settlement (invoice + wallet + payment row + transaction row).

use crate::types::{
    ApprovalId, Card, CardApproval, CardId, Invoice, InvoiceId, LedgerError, NewApproval, NewCard,
    NewInvoice, NewPayment, NewTransaction, Payment, PaymentId, Transaction, TransactionId, Wallet,
};

/// Staged state of a card charge
///
/// The closure passed to [`LedgerStore::charge_card`] works on copies of the
/// card and wallet rows. The store writes them back, together with the staged
/// transaction row, only if a transaction row was staged.
#[derive(Debug, Clone)]
pub struct ChargeUnit {
    pub card: Card,
    pub wallet: Wallet,
    staged: Option<NewTransaction>,
}

impl ChargeUnit {
    pub fn new(card: Card, wallet: Wallet) -> Self {
        ChargeUnit {
            card,
            wallet,
            staged: None,
        }
    }

    /// Stage the transaction row that commits this unit
    pub fn stage_transaction(&mut self, transaction: NewTransaction) {
        self.staged = Some(transaction);
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    pub fn into_parts(self) -> (Card, Wallet, Option<NewTransaction>) {
        (self.card, self.wallet, self.staged)
    }
}

/// Staged state of an invoice settlement
///
/// Commits only when a payment row was staged.
#[derive(Debug, Clone)]
pub struct SettlementUnit {
    pub invoice: Invoice,
    pub wallet: Wallet,
    payment: Option<NewPayment>,
    transaction: Option<NewTransaction>,
}

impl SettlementUnit {
    pub fn new(invoice: Invoice, wallet: Wallet) -> Self {
        SettlementUnit {
            invoice,
            wallet,
            payment: None,
            transaction: None,
        }
    }

    pub fn stage_payment(&mut self, payment: NewPayment, transaction: NewTransaction) {
        self.payment = Some(payment);
        self.transaction = Some(transaction);
    }

    pub fn into_parts(self) -> (Invoice, Wallet, Option<(NewPayment, Option<NewTransaction>)>) {
        let staged = self.payment.map(|payment| (payment, self.transaction));
        (self.invoice, self.wallet, staged)
    }
}

/// Rows written by a committed settlement
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub payment: Payment,
    pub transaction: Option<Transaction>,
}

/// Trait for the ledger's durable state
///
/// Reads return snapshots. Every `update_*` closure runs against a copy of the
/// row while the row is locked; the copy replaces the row only when the closure
/// returns `Ok`, so a failed closure never leaves a partial write.
///
/// Implementations must serialise concurrent updates per row and take locks in
/// the order card → wallet and invoice → wallet inside the units of work.
pub trait LedgerStore: Send + Sync {
    fn insert_card(&self, new: NewCard) -> Result<Card, LedgerError>;
    fn card(&self, id: CardId) -> Option<Card>;
    fn cards(&self) -> Vec<Card>;
    fn update_card<F, T>(&self, id: CardId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Card) -> Result<T, LedgerError>;
    fn remove_card(&self, id: CardId) -> Result<Card, LedgerError>;

    fn insert_approval(&self, new: NewApproval) -> Result<CardApproval, LedgerError>;
    fn approval(&self, id: ApprovalId) -> Option<CardApproval>;
    fn approvals(&self) -> Vec<CardApproval>;
    fn update_approval<F, T>(&self, id: ApprovalId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut CardApproval) -> Result<T, LedgerError>;

    fn insert_invoice(&self, new: NewInvoice) -> Result<Invoice, LedgerError>;
    fn invoice(&self, id: InvoiceId) -> Option<Invoice>;
    fn invoices(&self) -> Vec<Invoice>;
    fn update_invoice<F, T>(&self, id: InvoiceId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Invoice) -> Result<T, LedgerError>;
    /// Invoice whose `locked_card_id` points at `card_id`, if any
    fn invoice_locked_to(&self, card_id: CardId) -> Option<Invoice>;

    fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, LedgerError>;
    fn transaction(&self, id: TransactionId) -> Option<Transaction>;
    fn transactions(&self) -> Vec<Transaction>;
    fn transactions_for_card(&self, card_id: CardId) -> Vec<Transaction>;
    /// Update a transaction row; its status is recomputed before the write
    fn update_transaction<F, T>(&self, id: TransactionId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, LedgerError>;

    fn insert_payment(&self, new: NewPayment) -> Result<Payment, LedgerError>;
    fn payment(&self, id: PaymentId) -> Option<Payment>;
    fn payments_for_invoice(&self, invoice_id: InvoiceId) -> Vec<Payment>;
    fn update_payment<F, T>(&self, id: PaymentId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Payment) -> Result<T, LedgerError>;

    fn wallet(&self) -> Result<Wallet, LedgerError>;
    fn update_wallet<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Wallet) -> Result<T, LedgerError>;

    /// Run a card charge as one all-or-nothing unit
    ///
    /// Holds the card row and the wallet for the duration of `f`. Card, wallet
    /// and the staged transaction row are committed together iff `f` returns
    /// `Ok` and staged a transaction; otherwise nothing is written.
    fn charge_card<F, T>(
        &self,
        card_id: CardId,
        f: F,
    ) -> Result<(T, Option<Transaction>), LedgerError>
    where
        F: FnOnce(&mut ChargeUnit) -> Result<T, LedgerError>;

    /// Run a wallet-funded invoice settlement as one all-or-nothing unit
    ///
    /// Holds the invoice row and the wallet for the duration of `f`. Invoice,
    /// wallet, payment row and transaction row are committed together iff `f`
    /// returns `Ok` and staged a payment.
    fn settle_invoice<F, T>(
        &self,
        invoice_id: InvoiceId,
        f: F,
    ) -> Result<(T, Option<Settlement>), LedgerError>
    where
        F: FnOnce(&mut SettlementUnit) -> Result<T, LedgerError>;
}
