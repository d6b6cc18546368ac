//! AP payment installments and invoice status derivation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::invoice::{Invoice, InvoiceId, InvoiceStatus, PaymentMethod};

/// Payment identifier
pub type PaymentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Scheduled,
    Paid,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<DateTime<Utc>>,
    pub gl_account: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
}

impl Payment {
    pub fn from_new(id: PaymentId, new: NewPayment, now: DateTime<Utc>) -> Self {
        let status = new.status.unwrap_or(PaymentStatus::Scheduled);
        let paid_date = match status {
            PaymentStatus::Paid => Some(new.paid_date.unwrap_or(now)),
            _ => new.paid_date,
        };
        Payment {
            id,
            invoice_id: new.invoice_id,
            amount: new.amount,
            payment_method: new.payment_method,
            status,
            due_date: new.due_date,
            paid_date,
            gl_account: new.gl_account,
            department: new.department,
            cost_center: new.cost_center,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub gl_account: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub cost_center: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentUpdate {
    pub amount: Option<Decimal>,
    pub status: Option<PaymentStatus>,
    pub due_date: Option<NaiveDate>,
    pub gl_account: Option<String>,
    pub department: Option<String>,
    pub cost_center: Option<String>,
}

impl PaymentUpdate {
    pub fn apply(self, payment: &mut Payment, now: DateTime<Utc>) {
        if let Some(v) = self.amount {
            payment.amount = v;
        }
        if let Some(v) = self.status {
            if v == PaymentStatus::Paid && payment.paid_date.is_none() {
                payment.paid_date = Some(now);
            }
            payment.status = v;
        }
        if let Some(v) = self.due_date {
            payment.due_date = Some(v);
        }
        if let Some(v) = self.gl_account {
            payment.gl_account = Some(v);
        }
        if let Some(v) = self.department {
            payment.department = Some(v);
        }
        if let Some(v) = self.cost_center {
            payment.cost_center = Some(v);
        }
    }
}

/// Invoice status implied by its full set of payments
///
/// With no payments the invoice keeps its current status. Otherwise: fully
/// covered by paid installments → Paid; an unpaid installment past its due
/// date → Overdue; some installment paid → Partially Paid; else unchanged.
pub fn derive_invoice_status(
    invoice: &Invoice,
    payments: &[Payment],
    today: NaiveDate,
) -> Result<InvoiceStatus, LedgerError> {
    if payments.is_empty() {
        return Ok(invoice.status);
    }

    let paid = paid_total(payments)?;
    if paid >= invoice.amount {
        return Ok(InvoiceStatus::Paid);
    }

    let overdue = payments
        .iter()
        .any(|p| p.status != PaymentStatus::Paid && p.due_date.is_some_and(|due| due < today));
    if overdue {
        return Ok(InvoiceStatus::Overdue);
    }

    if paid > Decimal::ZERO {
        return Ok(InvoiceStatus::PartiallyPaid);
    }

    Ok(invoice.status)
}

/// Sum of the Paid installments
pub fn paid_total(payments: &[Payment]) -> Result<Decimal, LedgerError> {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .try_fold(Decimal::ZERO, |total, p| {
            total
                .checked_add(p.amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("invoice paid total"))
        })
}
