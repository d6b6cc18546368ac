//! In-memory ledger store
//!
//! This module provides `InMemoryLedger`, the `LedgerStore` implementation
//! backing the service. Each entity table is a `DashMap`, giving fine-grained
//! per-row locking: updates to different cards proceed in parallel while
//! updates to the same card are serialised. The wallet singleton sits behind
//! a `Mutex` so every debit serialises on it.
//!
//! # Lock Ordering
//!
//! The only places where two locks are held at once are the units of work:
//! `charge_card` (card row, then wallet) and `settle_invoice` (invoice row,
//! then wallet). No other path nests locks, so the lock graph is acyclic.

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::traits::{ChargeUnit, LedgerStore, Settlement, SettlementUnit};
use crate::types::{
    ApprovalId, Card, CardApproval, CardId, Invoice, InvoiceId, LedgerError, NewApproval, NewCard,
    NewInvoice, NewPayment, NewTransaction, Payment, PaymentId, Transaction, TransactionId, Wallet,
};

/// Monotonic id sequence starting at 1
#[derive(Debug, Default)]
struct Sequence(AtomicU64);

impl Sequence {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Thread-safe in-memory implementation of [`LedgerStore`]
#[derive(Debug)]
pub struct InMemoryLedger {
    cards: DashMap<CardId, Card>,
    approvals: DashMap<ApprovalId, CardApproval>,
    invoices: DashMap<InvoiceId, Invoice>,
    transactions: DashMap<TransactionId, Transaction>,
    payments: DashMap<PaymentId, Payment>,
    wallet: Mutex<Wallet>,
    card_ids: Sequence,
    approval_ids: Sequence,
    invoice_ids: Sequence,
    transaction_ids: Sequence,
    payment_ids: Sequence,
}

impl InMemoryLedger {
    /// Create an empty ledger whose wallet holds `opening_balance`
    pub fn new(opening_balance: Decimal) -> Self {
        Self {
            cards: DashMap::new(),
            approvals: DashMap::new(),
            invoices: DashMap::new(),
            transactions: DashMap::new(),
            payments: DashMap::new(),
            wallet: Mutex::new(Wallet::new(opening_balance)),
            card_ids: Sequence::default(),
            approval_ids: Sequence::default(),
            invoice_ids: Sequence::default(),
            transaction_ids: Sequence::default(),
            payment_ids: Sequence::default(),
        }
    }

    fn lock_wallet(&self) -> Result<MutexGuard<'_, Wallet>, LedgerError> {
        self.wallet
            .lock()
            .map_err(|_| LedgerError::persistence("wallet lock poisoned"))
    }

    fn new_transaction_row(&self, new: NewTransaction) -> Transaction {
        Transaction::from_new(self.transaction_ids.next(), new, Utc::now())
    }

    fn new_payment_row(&self, new: NewPayment) -> Payment {
        Payment::from_new(self.payment_ids.next(), new, Utc::now())
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

/// Run `f` on a copy of the row under its lock and write the copy back on success
fn update_row<V, F, T>(
    map: &DashMap<u64, V>,
    entity: &'static str,
    id: u64,
    f: F,
) -> Result<T, LedgerError>
where
    V: Clone,
    F: FnOnce(&mut V) -> Result<T, LedgerError>,
{
    let mut entry = map
        .get_mut(&id)
        .ok_or_else(|| LedgerError::not_found(entity, id))?;
    let mut staged = entry.value().clone();
    let out = f(&mut staged)?;
    *entry.value_mut() = staged;
    Ok(out)
}

/// Snapshot every row sorted by id for deterministic listings
fn sorted_rows<V: Clone>(map: &DashMap<u64, V>) -> Vec<V> {
    let mut rows: Vec<(u64, V)> = map
        .iter()
        .map(|entry| (*entry.key(), entry.value().clone()))
        .collect();
    rows.sort_by_key(|(id, _)| *id);
    rows.into_iter().map(|(_, row)| row).collect()
}

impl LedgerStore for InMemoryLedger {
    fn insert_card(&self, new: NewCard) -> Result<Card, LedgerError> {
        let card = Card::from_new(self.card_ids.next(), new, Utc::now());
        self.cards.insert(card.id, card.clone());
        Ok(card)
    }

    fn card(&self, id: CardId) -> Option<Card> {
        self.cards.get(&id).map(|entry| entry.value().clone())
    }

    fn cards(&self) -> Vec<Card> {
        sorted_rows(&self.cards)
    }

    fn update_card<F, T>(&self, id: CardId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Card) -> Result<T, LedgerError>,
    {
        update_row(&self.cards, "Card", id, f)
    }

    fn remove_card(&self, id: CardId) -> Result<Card, LedgerError> {
        self.cards
            .remove(&id)
            .map(|(_, card)| card)
            .ok_or_else(|| LedgerError::not_found("Card", id))
    }

    fn insert_approval(&self, new: NewApproval) -> Result<CardApproval, LedgerError> {
        let approval = CardApproval::from_new(self.approval_ids.next(), new, Utc::now());
        self.approvals.insert(approval.id, approval.clone());
        Ok(approval)
    }

    fn approval(&self, id: ApprovalId) -> Option<CardApproval> {
        self.approvals.get(&id).map(|entry| entry.value().clone())
    }

    fn approvals(&self) -> Vec<CardApproval> {
        sorted_rows(&self.approvals)
    }

    fn update_approval<F, T>(&self, id: ApprovalId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut CardApproval) -> Result<T, LedgerError>,
    {
        update_row(&self.approvals, "Card approval", id, f)
    }

    fn insert_invoice(&self, new: NewInvoice) -> Result<Invoice, LedgerError> {
        let invoice = Invoice::from_new(self.invoice_ids.next(), new, Utc::now());
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.invoices.get(&id).map(|entry| entry.value().clone())
    }

    fn invoices(&self) -> Vec<Invoice> {
        sorted_rows(&self.invoices)
    }

    fn update_invoice<F, T>(&self, id: InvoiceId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Invoice) -> Result<T, LedgerError>,
    {
        update_row(&self.invoices, "Invoice", id, f)
    }

    fn invoice_locked_to(&self, card_id: CardId) -> Option<Invoice> {
        self.invoices
            .iter()
            .find(|entry| entry.value().locked_card_id == Some(card_id))
            .map(|entry| entry.value().clone())
    }

    fn insert_transaction(&self, new: NewTransaction) -> Result<Transaction, LedgerError> {
        let transaction = self.new_transaction_row(new);
        self.transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.get(&id).map(|entry| entry.value().clone())
    }

    fn transactions(&self) -> Vec<Transaction> {
        sorted_rows(&self.transactions)
    }

    fn transactions_for_card(&self, card_id: CardId) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().card_id == Some(card_id))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|tx| tx.id);
        rows
    }

    fn update_transaction<F, T>(&self, id: TransactionId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, LedgerError>,
    {
        update_row(&self.transactions, "Transaction", id, |tx| {
            let out = f(tx)?;
            tx.refresh_status();
            Ok(out)
        })
    }

    fn insert_payment(&self, new: NewPayment) -> Result<Payment, LedgerError> {
        let payment = self.new_payment_row(new);
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    fn payment(&self, id: PaymentId) -> Option<Payment> {
        self.payments.get(&id).map(|entry| entry.value().clone())
    }

    fn payments_for_invoice(&self, invoice_id: InvoiceId) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self
            .payments
            .iter()
            .filter(|entry| entry.value().invoice_id == invoice_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|p| p.id);
        rows
    }

    fn update_payment<F, T>(&self, id: PaymentId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Payment) -> Result<T, LedgerError>,
    {
        update_row(&self.payments, "Payment", id, f)
    }

    fn wallet(&self) -> Result<Wallet, LedgerError> {
        Ok(self.lock_wallet()?.clone())
    }

    fn update_wallet<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Wallet) -> Result<T, LedgerError>,
    {
        let mut wallet = self.lock_wallet()?;
        let mut staged = wallet.clone();
        let out = f(&mut staged)?;
        *wallet = staged;
        Ok(out)
    }

    fn charge_card<F, T>(
        &self,
        card_id: CardId,
        f: F,
    ) -> Result<(T, Option<Transaction>), LedgerError>
    where
        F: FnOnce(&mut ChargeUnit) -> Result<T, LedgerError>,
    {
        let mut card_entry = self
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| LedgerError::not_found("Card", card_id))?;
        let mut wallet = self.lock_wallet()?;

        let mut unit = ChargeUnit::new(card_entry.value().clone(), wallet.clone());
        let out = f(&mut unit)?;

        let (card, staged_wallet, staged) = unit.into_parts();
        let Some(new_tx) = staged else {
            return Ok((out, None));
        };

        let transaction = self.new_transaction_row(new_tx);
        self.transactions
            .insert(transaction.id, transaction.clone());
        *card_entry.value_mut() = card;
        *wallet = staged_wallet;

        Ok((out, Some(transaction)))
    }

    fn settle_invoice<F, T>(
        &self,
        invoice_id: InvoiceId,
        f: F,
    ) -> Result<(T, Option<Settlement>), LedgerError>
    where
        F: FnOnce(&mut SettlementUnit) -> Result<T, LedgerError>,
    {
        let mut invoice_entry = self
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))?;
        let mut wallet = self.lock_wallet()?;

        let mut unit = SettlementUnit::new(invoice_entry.value().clone(), wallet.clone());
        let out = f(&mut unit)?;

        let (invoice, staged_wallet, staged) = unit.into_parts();
        let Some((new_payment, new_tx)) = staged else {
            return Ok((out, None));
        };

        let payment = self.new_payment_row(new_payment);
        self.payments.insert(payment.id, payment.clone());
        let transaction = new_tx.map(|new_tx| {
            let transaction = self.new_transaction_row(new_tx);
            self.transactions
                .insert(transaction.id, transaction.clone());
            transaction
        });
        *invoice_entry.value_mut() = invoice;
        *wallet = staged_wallet;

        Ok((
            out,
            Some(Settlement {
                payment,
                transaction,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CardStatus, PaymentMethod};
    use std::sync::Arc;
    use std::thread;

    fn card_request(limit: i64) -> NewCard {
        NewCard {
            cardholder_name: "Dana Ops".to_string(),
            spend_limit: Decimal::new(limit, 0),
            status: Some(CardStatus::Active),
            purpose: "Software".to_string(),
            requested_by: "dana".to_string(),
            ..Default::default()
        }
    }

    fn charge_row(card_id: CardId, amount: Decimal) -> NewTransaction {
        NewTransaction {
            card_id: Some(card_id),
            invoice_id: None,
            amount,
            vendor_name: "Acme".to_string(),
            payment_method: PaymentMethod::Card,
            gl_account: None,
            department: None,
            cost_center: None,
            memo: None,
        }
    }

    #[test]
    fn test_ids_are_sequential_per_table() {
        let ledger = InMemoryLedger::default();
        let first = ledger.insert_card(card_request(10)).unwrap();
        let second = ledger.insert_card(card_request(10)).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(ledger.cards().len(), 2);
    }

    #[test]
    fn test_update_missing_card_is_not_found() {
        let ledger = InMemoryLedger::default();
        let result = ledger.update_card(99, |_| Ok(()));
        assert_eq!(result.unwrap_err(), LedgerError::not_found("Card", 99));
    }

    #[test]
    fn test_failed_update_leaves_row_untouched() {
        let ledger = InMemoryLedger::default();
        let card = ledger.insert_card(card_request(100)).unwrap();

        let result: Result<(), _> = ledger.update_card(card.id, |card| {
            card.current_spend = Decimal::new(50, 0);
            Err(LedgerError::conflict("nope"))
        });

        assert!(result.is_err());
        assert_eq!(ledger.card(card.id).unwrap().current_spend, Decimal::ZERO);
    }

    #[test]
    fn test_charge_without_staged_row_writes_nothing() {
        let ledger = InMemoryLedger::new(Decimal::new(100, 0));
        let card = ledger.insert_card(card_request(100)).unwrap();

        let (_, transaction) = ledger
            .charge_card(card.id, |unit| {
                unit.wallet.balance = Decimal::ZERO;
                unit.card.current_spend = Decimal::new(100, 0);
                Ok(())
            })
            .unwrap();

        assert!(transaction.is_none());
        assert_eq!(ledger.wallet().unwrap().balance, Decimal::new(100, 0));
        assert_eq!(ledger.card(card.id).unwrap().current_spend, Decimal::ZERO);
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn test_charge_with_staged_row_commits_everything() {
        let ledger = InMemoryLedger::new(Decimal::new(100, 0));
        let card = ledger.insert_card(card_request(100)).unwrap();
        let amount = Decimal::new(40, 0);

        let (_, transaction) = ledger
            .charge_card(card.id, |unit| {
                unit.wallet.debit(amount)?;
                unit.card.current_spend += amount;
                unit.stage_transaction(charge_row(unit.card.id, amount));
                Ok(())
            })
            .unwrap();

        let transaction = transaction.unwrap();
        assert_eq!(transaction.amount, amount);
        assert_eq!(ledger.wallet().unwrap().balance, Decimal::new(60, 0));
        assert_eq!(ledger.card(card.id).unwrap().current_spend, amount);
        assert_eq!(ledger.transactions_for_card(card.id).len(), 1);
    }

    #[test]
    fn test_invoice_locked_to_finds_binding() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .insert_invoice(NewInvoice {
                invoice_number: "INV-7".to_string(),
                vendor_name: "Acme".to_string(),
                vendor_email: None,
                amount: Decimal::new(100, 0),
                due_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                status: None,
                description: None,
                payment_method: None,
                payment_terms: Default::default(),
                approved_by: None,
            })
            .unwrap();
        ledger
            .update_invoice(invoice.id, |inv| {
                inv.locked_card_id = Some(3);
                Ok(())
            })
            .unwrap();

        assert_eq!(ledger.invoice_locked_to(3).map(|inv| inv.id), Some(invoice.id));
        assert!(ledger.invoice_locked_to(4).is_none());
    }

    #[test]
    fn test_concurrent_charges_on_same_card_do_not_lose_updates() {
        let ledger = Arc::new(InMemoryLedger::new(Decimal::new(1_000_000, 0)));
        let card = ledger.insert_card(card_request(1_000_000)).unwrap();
        let amount = Decimal::new(1, 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..250 {
                        ledger
                            .charge_card(card.id, |unit| {
                                unit.wallet.debit(amount)?;
                                unit.card.current_spend += amount;
                                unit.stage_transaction(charge_row(unit.card.id, amount));
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.card(card.id).unwrap().current_spend, Decimal::new(2000, 0));
        assert_eq!(ledger.wallet().unwrap().balance, Decimal::new(998_000, 0));
        assert_eq!(ledger.transactions().len(), 2000);
    }
}
