//! Invoice and payment records
//!
//! Data-layer rules for invoices:
//! - an invoice bound to a card that is not Suspended is read-only except for
//!   its status; every other field in an update is rejected together
//! - invoice status is re-derived from the payment set whenever a payment is
//!   recorded or updated

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::traits::LedgerStore;
use crate::types::{
    derive_invoice_status, paid_total, require_positive, CardStatus, Invoice, InvoiceId, InvoiceUpdate,
    LedgerError, NewInvoice, NewPayment, Payment, PaymentId, PaymentMethod, PaymentStatus,
    PaymentUpdate,
};

/// Reject a payment whose method differs from the invoice's first one
pub fn ensure_method_allowed(invoice: &Invoice, method: PaymentMethod) -> Result<(), LedgerError> {
    match invoice.first_payment_method {
        Some(first) if first != method => Err(LedgerError::conflict(format!(
            "payment method locked to {}",
            first
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug)]
pub struct InvoiceLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for InvoiceLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> InvoiceLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_invoice(&self, new: NewInvoice) -> Result<Invoice, LedgerError> {
        if new.invoice_number.trim().is_empty() {
            return Err(LedgerError::validation("invoiceNumber is required"));
        }
        if new.vendor_name.trim().is_empty() {
            return Err(LedgerError::validation("vendorName is required"));
        }
        require_positive(new.amount, "amount")?;

        let invoice = self.store.insert_invoice(new)?;
        tracing::info!(
            invoice_id = invoice.id,
            invoice_number = %invoice.invoice_number,
            amount = %invoice.amount,
            "Invoice created"
        );
        Ok(invoice)
    }

    pub fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, LedgerError> {
        self.store
            .invoice(invoice_id)
            .ok_or_else(|| LedgerError::not_found("Invoice", invoice_id))
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.store.invoices()
    }

    /// Whether the invoice is bound to a card that still holds the lock
    pub fn is_locked(&self, invoice: &Invoice) -> bool {
        invoice
            .locked_card_id
            .and_then(|card_id| self.store.card(card_id))
            .is_some_and(|card| card.status != CardStatus::Suspended)
    }

    /// Generic partial update, subject to the invoice-lock allow-list
    pub fn update_invoice(
        &self,
        invoice_id: InvoiceId,
        update: InvoiceUpdate,
    ) -> Result<Invoice, LedgerError> {
        let current = self.invoice(invoice_id)?;
        let locked = self.is_locked(&current);
        if locked {
            let blocked = update.non_status_fields();
            if !blocked.is_empty() {
                tracing::info!(invoice_id, blocked = ?blocked, "Locked invoice update rejected");
                return Err(LedgerError::blocked_fields(
                    format!(
                        "Invoice {} is locked to card {}; only status can be changed",
                        current.invoice_number,
                        current.locked_card_id.unwrap_or_default()
                    ),
                    blocked,
                ));
            }
        }
        if let Some(amount) = update.amount {
            require_positive(amount, "amount")?;
        }

        let now = Utc::now();
        self.store.update_invoice(invoice_id, |invoice| {
            update.apply(invoice, now);
            Ok(invoice.clone())
        })
    }

    /// Re-derive the invoice status from its payments
    pub fn refresh_status(&self, invoice_id: InvoiceId) -> Result<Invoice, LedgerError> {
        self.invoice(invoice_id)?;
        let payments = self.store.payments_for_invoice(invoice_id);
        let today = Utc::now().date_naive();
        let invoice = self.store.update_invoice(invoice_id, |invoice| {
            invoice.status = derive_invoice_status(invoice, &payments, today)?;
            Ok(invoice.clone())
        })?;
        tracing::debug!(invoice_id, status = %invoice.status, "Invoice status refreshed");
        Ok(invoice)
    }

    pub fn payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, LedgerError> {
        self.invoice(invoice_id)?;
        Ok(self.store.payments_for_invoice(invoice_id))
    }

    /// Invoice amount not yet covered by Paid payments, floored at zero
    pub fn outstanding(&self, invoice_id: InvoiceId) -> Result<Decimal, LedgerError> {
        let invoice = self.invoice(invoice_id)?;
        let paid = paid_total(&self.store.payments_for_invoice(invoice_id))?;
        let outstanding = invoice
            .amount
            .checked_sub(paid)
            .ok_or_else(|| LedgerError::arithmetic_overflow("invoice outstanding amount"))?;
        Ok(outstanding.max(Decimal::ZERO))
    }

    /// Record a payment row and refresh the invoice status
    ///
    /// The payment-method lock applies: a row whose method differs from the
    /// invoice's first payment method is rejected.
    pub fn record_payment(&self, new: NewPayment) -> Result<(Payment, Invoice), LedgerError> {
        require_positive(new.amount, "amount")?;
        let invoice = self.invoice(new.invoice_id)?;
        ensure_method_allowed(&invoice, new.payment_method)?;
        if new.status == Some(PaymentStatus::Paid) {
            paid_total(&self.store.payments_for_invoice(invoice.id))?
                .checked_add(new.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("invoice paid total"))?;
        }

        let payment = self.store.insert_payment(new)?;
        let invoice = self.refresh_status(payment.invoice_id)?;
        tracing::info!(
            payment_id = payment.id,
            invoice_id = invoice.id,
            method = %payment.payment_method,
            amount = %payment.amount,
            "Payment recorded"
        );
        Ok((payment, invoice))
    }

    /// Update a payment row and refresh the invoice status
    pub fn update_payment(
        &self,
        payment_id: PaymentId,
        update: PaymentUpdate,
    ) -> Result<(Payment, Invoice), LedgerError> {
        if let Some(amount) = update.amount {
            require_positive(amount, "amount")?;
        }
        let now = Utc::now();
        let payment = self.store.update_payment(payment_id, |payment| {
            update.apply(payment, now);
            Ok(payment.clone())
        })?;
        let invoice = self.refresh_status(payment.invoice_id)?;
        Ok((payment, invoice))
    }
}
