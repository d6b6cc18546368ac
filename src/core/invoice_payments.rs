//! Invoice payment orchestration
//!
//! This module binds invoices to cards and drives them through payment.
//!
//! # Architecture
//!
//! Paying by card is a two-phase flow:
//! 1. create or reuse an Active card for the invoice and link it; this phase
//!    is idempotent and is never rolled back
//! 2. charge the full invoice amount through the [`TransactionAuthorizer`];
//!    a decline leaves the card linked so the payment can be retried once
//!    the wallet is funded
//!
//! ACH and check payments bypass cards entirely. A wallet-funded payment
//! commits the debit, the payment row and the transaction row as one unit.
//!
//! Every path checks the payment-method lock before touching the store: once
//! an invoice has a first payment method, no other method may be used. The
//! card path claims the method while linking, under the invoice lock and
//! before any charge, so a concurrent ACH or check settlement is refused.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::authorizer::{ApprovedCharge, Authorization, ChargeRequest, DeclineReason, TransactionAuthorizer};
use super::card_lifecycle::CardLifecycleManager;
use super::invoice_ledger::{ensure_method_allowed, InvoiceLedger};
use super::traits::LedgerStore;
use crate::types::{
    require_positive, Card, CardStatus, Invoice, InvoiceId, InvoiceStatus, LedgerError,
    NewCard, NewPayment, NewTransaction, Payment, PaymentMethod, PaymentStatus, Transaction,
};

/// Card options a payment request may override
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceCardSpec {
    /// Defaults to the vendor name
    pub cardholder_name: Option<String>,
    pub requested_by: Option<String>,
    pub currency: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub allowed_merchants: Vec<String>,
    pub gl_account_template: Option<String>,
    pub department_template: Option<String>,
    pub cost_center_template: Option<String>,
}

/// Where an ACH or check payment is funded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingSource {
    /// Debit the company wallet
    #[default]
    Wallet,
    /// Paid outside the ledger; only recorded
    External,
}

/// Result of paying an invoice by immediate card charge
#[derive(Debug, Clone)]
pub enum CardPaymentOutcome {
    Paid {
        card: Card,
        invoice: Invoice,
        payment: Payment,
        charge: ApprovedCharge,
    },
    /// The card stays linked for a later retry
    Declined {
        card: Card,
        invoice: Invoice,
        reason: DeclineReason,
    },
}

/// Result of an ACH or check payment
#[derive(Debug, Clone)]
pub struct BankPayment {
    pub invoice: Invoice,
    pub payment: Payment,
    pub transaction: Transaction,
    /// Wallet balance after the debit, for wallet-funded payments
    pub new_wallet_balance: Option<Decimal>,
}

#[derive(Debug)]
pub struct InvoicePaymentOrchestrator<S> {
    store: Arc<S>,
    cards: CardLifecycleManager<S>,
    authorizer: TransactionAuthorizer<S>,
    invoices: InvoiceLedger<S>,
}

impl<S> Clone for InvoicePaymentOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cards: self.cards.clone(),
            authorizer: self.authorizer.clone(),
            invoices: self.invoices.clone(),
        }
    }
}

impl<S: LedgerStore> InvoicePaymentOrchestrator<S> {
    pub fn new(
        store: Arc<S>,
        cards: CardLifecycleManager<S>,
        authorizer: TransactionAuthorizer<S>,
        invoices: InvoiceLedger<S>,
    ) -> Self {
        Self {
            store,
            cards,
            authorizer,
            invoices,
        }
    }

    /// Pay an invoice in full by charging a card issued for it
    pub fn pay_via_immediate_charge(
        &self,
        invoice_id: InvoiceId,
        spec: InvoiceCardSpec,
    ) -> Result<CardPaymentOutcome, LedgerError> {
        let invoice = self.payable_invoice(invoice_id, PaymentMethod::Card)?;

        let card = self.card_for_invoice(&invoice, spec)?;
        let invoice = match self.link_card(&invoice, &card) {
            Ok(invoice) => invoice,
            Err(e) => {
                self.retire_unlinked_card(&invoice, &card);
                return Err(e);
            }
        };

        let request = ChargeRequest::new(card.id, invoice.amount).with_merchant(&invoice.vendor_name);
        let charge = match self.authorizer.authorize(request)? {
            Authorization::Approved(charge) => charge,
            Authorization::Declined { reason } => {
                tracing::info!(
                    invoice_id,
                    card_id = card.id,
                    reason = %reason,
                    "Invoice card charge declined; card kept for retry"
                );
                let card = self.cards.card(card.id)?;
                return Ok(CardPaymentOutcome::Declined {
                    card,
                    invoice,
                    reason,
                });
            }
        };

        let (payment, invoice) = self.invoices.record_payment(NewPayment {
            invoice_id,
            amount: charge.transaction.amount,
            payment_method: PaymentMethod::Card,
            status: Some(PaymentStatus::Paid),
            due_date: Some(invoice.due_date),
            paid_date: Some(charge.transaction.transaction_date),
            gl_account: charge.transaction.gl_account.clone(),
            department: charge.transaction.department.clone(),
            cost_center: charge.transaction.cost_center.clone(),
        })?;
        let card = self.cards.card(card.id)?;

        tracing::info!(
            invoice_id,
            card_id = card.id,
            payment_id = payment.id,
            status = %invoice.status,
            "Invoice paid by card"
        );
        Ok(CardPaymentOutcome::Paid {
            card,
            invoice,
            payment,
            charge,
        })
    }

    /// Issue a card for the vendor to charge themselves; nothing is charged here
    pub fn pay_via_shared_card(
        &self,
        invoice_id: InvoiceId,
        spec: InvoiceCardSpec,
        vendor_email: &str,
    ) -> Result<(Card, Invoice), LedgerError> {
        let vendor_email = vendor_email.trim();
        if !is_plausible_email(vendor_email) {
            return Err(LedgerError::validation(
                "A valid vendor email is required to share a card",
            ));
        }
        let invoice = self.payable_invoice(invoice_id, PaymentMethod::Card)?;
        let card = self.card_for_invoice(&invoice, spec)?;

        let invoice = self.store.update_invoice(invoice_id, |invoice| {
            if invoice.locked_card_id.is_none() {
                invoice.locked_card_id = Some(card.id);
            }
            invoice.payment_method = Some(PaymentMethod::Card.to_string());
            invoice.status = InvoiceStatus::CardShared;
            invoice.vendor_email = Some(vendor_email.to_string());
            invoice.first_payment_method.get_or_insert(PaymentMethod::Card);
            Ok(invoice.clone())
        })?;

        tracing::info!(
            invoice_id,
            card_id = card.id,
            linked = invoice.locked_card_id == Some(card.id),
            "Card shared with vendor"
        );
        Ok((card, invoice))
    }

    /// Pay an invoice by ACH or check
    ///
    /// A wallet-funded payment fails with `InsufficientFunds` before any row
    /// is written when the wallet cannot cover `amount`.
    pub fn pay_via_ach_or_check(
        &self,
        invoice_id: InvoiceId,
        amount: Decimal,
        method: PaymentMethod,
        source: FundingSource,
    ) -> Result<BankPayment, LedgerError> {
        if method == PaymentMethod::Card {
            return Err(LedgerError::validation(
                "Card payments go through the card payment routes",
            ));
        }
        let amount = require_positive(amount, "amount")?;
        self.payable_invoice(invoice_id, method)?;

        let now = Utc::now();
        let (new_wallet_balance, settlement) = self.store.settle_invoice(invoice_id, |unit| {
            ensure_method_allowed(&unit.invoice, method)?;
            let new_wallet_balance = match source {
                FundingSource::Wallet => Some(unit.wallet.debit(amount)?),
                FundingSource::External => None,
            };

            let invoice = &mut unit.invoice;
            invoice.first_payment_method.get_or_insert(method);
            invoice.payment_method = Some(method.to_string());
            let payment = NewPayment {
                invoice_id,
                amount,
                payment_method: method,
                status: Some(PaymentStatus::Paid),
                due_date: Some(invoice.due_date),
                paid_date: Some(now),
                gl_account: None,
                department: None,
                cost_center: None,
            };
            let transaction = NewTransaction {
                card_id: None,
                invoice_id: Some(invoice_id),
                amount,
                vendor_name: invoice.vendor_name.clone(),
                payment_method: method,
                gl_account: None,
                department: None,
                cost_center: None,
                memo: Some(format!("{} payment for {}", method, invoice.invoice_number)),
            };
            unit.stage_payment(payment, transaction);
            Ok(new_wallet_balance)
        })?;

        let settlement = settlement.ok_or_else(|| {
            LedgerError::persistence(format!("Invoice {} settlement was not committed", invoice_id))
        })?;
        let transaction = settlement.transaction.ok_or_else(|| {
            LedgerError::persistence(format!("Invoice {} settlement has no transaction row", invoice_id))
        })?;
        let invoice = self.invoices.refresh_status(invoice_id)?;

        tracing::info!(
            invoice_id,
            payment_id = settlement.payment.id,
            method = %method,
            source = ?source,
            amount = %amount,
            status = %invoice.status,
            "Invoice paid by bank transfer"
        );
        Ok(BankPayment {
            invoice,
            payment: settlement.payment,
            transaction,
            new_wallet_balance,
        })
    }

    /// Load an invoice and check it may still be paid with `method`
    fn payable_invoice(
        &self,
        invoice_id: InvoiceId,
        method: PaymentMethod,
    ) -> Result<Invoice, LedgerError> {
        let invoice = self.invoices.invoice(invoice_id)?;
        ensure_method_allowed(&invoice, method)?;
        if invoice.status == InvoiceStatus::Paid {
            return Err(LedgerError::conflict(format!(
                "Invoice {} is already paid",
                invoice.invoice_number
            )));
        }
        Ok(invoice)
    }

    /// Reuse the invoice's Active locked card, or issue a pre-activated one
    fn card_for_invoice(&self, invoice: &Invoice, spec: InvoiceCardSpec) -> Result<Card, LedgerError> {
        let reusable = invoice
            .locked_card_id
            .and_then(|card_id| self.store.card(card_id))
            .filter(|card| card.status == CardStatus::Active);
        if let Some(card) = reusable {
            tracing::debug!(invoice_id = invoice.id, card_id = card.id, "Reusing invoice card");
            return Ok(card);
        }

        let defaults = invoice.payment_terms.card_defaults();
        self.cards.issue_active_card(NewCard {
            cardholder_name: spec
                .cardholder_name
                .unwrap_or_else(|| invoice.vendor_name.clone()),
            spend_limit: invoice.amount,
            status: Some(CardStatus::Active),
            purpose: format!("Payment for {}", invoice.invoice_number),
            invoice_id: Some(invoice.id),
            requested_by: spec
                .requested_by
                .unwrap_or_else(|| "Accounts Payable".to_string()),
            approved_by: Some("Auto-approved".to_string()),
            currency: spec.currency,
            valid_from: None,
            valid_until: spec.valid_until,
            allowed_merchants: spec.allowed_merchants,
            allowed_mccs: Vec::new(),
            allowed_countries: Vec::new(),
            channel_restriction: Default::default(),
            gl_account_template: spec.gl_account_template,
            department_template: spec.department_template,
            cost_center_template: spec.cost_center_template,
            limit_type: defaults.limit_type,
            transaction_count: defaults.transaction_count,
            renewal_frequency: defaults.renewal_frequency,
        })
    }

    /// Point the invoice at `card` and claim the card payment method
    ///
    /// Fails with `Conflict` when the invoice was meanwhile paid by another
    /// method. An invoice already locked to another card keeps that lock; the
    /// mismatch is logged and the payment proceeds with the unlinked card.
    fn link_card(&self, invoice: &Invoice, card: &Card) -> Result<Invoice, LedgerError> {
        let (linked, existing) = self.store.update_invoice(invoice.id, |invoice| {
            ensure_method_allowed(invoice, PaymentMethod::Card)?;
            invoice.first_payment_method.get_or_insert(PaymentMethod::Card);
            invoice.payment_method = Some(PaymentMethod::Card.to_string());
            match invoice.locked_card_id {
                Some(existing) if existing != card.id => Ok((invoice.clone(), Some(existing))),
                _ => {
                    invoice.locked_card_id = Some(card.id);
                    Ok((invoice.clone(), None))
                }
            }
        })?;

        if let Some(existing) = existing {
            tracing::warn!(
                invoice_id = invoice.id,
                card_id = card.id,
                locked_card_id = existing,
                "Invoice already locked to another card; link skipped"
            );
        }
        Ok(linked)
    }

    /// Suspend a card issued for an invoice it could not be linked to
    fn retire_unlinked_card(&self, invoice: &Invoice, card: &Card) {
        if invoice.locked_card_id == Some(card.id) {
            return;
        }
        if let Err(e) = self.cards.suspend_card(card.id) {
            tracing::warn!(card_id = card.id, error = %e, "Unlinked invoice card left active");
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
