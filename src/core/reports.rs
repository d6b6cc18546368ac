//! Spend reporting
//!
//! Aggregates over the store for the finance dashboard. Breakdowns use
//! `BTreeMap` so the serialized output is ordered and stable.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::traits::LedgerStore;
use crate::types::{ApprovalStatus, LedgerError, PaymentMethod, PaymentStatus};

/// Label for transactions without the relevant coding
pub const UNCODED: &str = "Uncoded";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub wallet_balance: Decimal,
    /// Sum of every posted card charge
    pub total_card_spend: Decimal,
    /// Sum of every Paid invoice payment, all methods
    pub total_invoice_payments: Decimal,
    pub spend_by_gl_account: BTreeMap<String, Decimal>,
    pub spend_by_cost_center: BTreeMap<String, Decimal>,
    pub transactions_by_status: BTreeMap<String, usize>,
    pub invoices_by_status: BTreeMap<String, usize>,
    pub cards_by_status: BTreeMap<String, usize>,
    pub pending_approvals: usize,
}

/// Build the summary from a consistent-enough snapshot of each table
pub fn summarize<S: LedgerStore>(store: &S) -> Result<LedgerSummary, LedgerError> {
    let wallet_balance = store.wallet()?.balance;
    let transactions = store.transactions();

    let mut total_card_spend = Decimal::ZERO;
    let mut spend_by_gl_account: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut spend_by_cost_center: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut transactions_by_status: BTreeMap<String, usize> = BTreeMap::new();

    for tx in &transactions {
        *transactions_by_status
            .entry(tx.status.label().to_string())
            .or_default() += 1;
        if tx.payment_method != PaymentMethod::Card {
            continue;
        }
        total_card_spend = total_card_spend
            .checked_add(tx.amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("card spend total"))?;
        add_to(&mut spend_by_gl_account, tx.gl_account.as_deref(), tx.amount)?;
        add_to(&mut spend_by_cost_center, tx.cost_center.as_deref(), tx.amount)?;
    }

    let mut invoices_by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_invoice_payments = Decimal::ZERO;
    for invoice in store.invoices() {
        *invoices_by_status.entry(invoice.status.to_string()).or_default() += 1;
        for payment in store.payments_for_invoice(invoice.id) {
            if payment.status == PaymentStatus::Paid {
                total_invoice_payments = total_invoice_payments
                    .checked_add(payment.amount)
                    .ok_or_else(|| LedgerError::arithmetic_overflow("invoice payment total"))?;
            }
        }
    }

    let mut cards_by_status: BTreeMap<String, usize> = BTreeMap::new();
    for card in store.cards() {
        *cards_by_status.entry(card.status.to_string()).or_default() += 1;
    }

    let pending_approvals = store
        .approvals()
        .iter()
        .filter(|approval| approval.status == ApprovalStatus::Pending)
        .count();

    Ok(LedgerSummary {
        wallet_balance,
        total_card_spend,
        total_invoice_payments,
        spend_by_gl_account,
        spend_by_cost_center,
        transactions_by_status,
        invoices_by_status,
        cards_by_status,
        pending_approvals,
    })
}

fn add_to(
    totals: &mut BTreeMap<String, Decimal>,
    key: Option<&str>,
    amount: Decimal,
) -> Result<(), LedgerError> {
    let key = key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(UNCODED);
    let entry = totals.entry(key.to_string()).or_default();
    *entry = entry
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("spend breakdown"))?;
    Ok(())
}
