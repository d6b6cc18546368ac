//! Invoice types and payment-terms defaults

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::card::{CardId, LimitType, RenewalFrequency, TransactionCount};
use super::error::LedgerError;

/// Invoice identifier
pub type InvoiceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Pending,
    Approved,
    #[serde(rename = "Card Shared - Awaiting Payment")]
    CardShared,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    Paid,
    Overdue,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Approved => "Approved",
            InvoiceStatus::CardShared => "Card Shared - Awaiting Payment",
            InvoiceStatus::PartiallyPaid => "Partially Paid",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Overdue => "Overdue",
        };
        f.write_str(label)
    }
}

/// Method an invoice is settled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Ach,
    Check,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Ach => "ach",
            PaymentMethod::Check => "check",
        };
        f.write_str(label)
    }
}

/// Payment terms printed on the invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentTerms {
    #[default]
    #[serde(rename = "Due on Receipt")]
    DueOnReceipt,
    #[serde(rename = "Net 30")]
    Net30,
    #[serde(rename = "Net 60")]
    Net60,
    #[serde(rename = "Net 90")]
    Net90,
    #[serde(rename = "2 Installments")]
    TwoInstallments,
    #[serde(rename = "3 Installments")]
    ThreeInstallments,
    #[serde(rename = "4 Installments")]
    FourInstallments,
    #[serde(rename = "Monthly Recurring")]
    MonthlyRecurring,
    #[serde(rename = "Quarterly Recurring")]
    QuarterlyRecurring,
    #[serde(rename = "Yearly Recurring")]
    YearlyRecurring,
}

/// Card shape implied by a set of payment terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardDefaults {
    pub limit_type: LimitType,
    pub transaction_count: TransactionCount,
    pub renewal_frequency: Option<RenewalFrequency>,
}

impl PaymentTerms {
    /// Card type, charge count and renewal cadence for cards paying these terms
    pub fn card_defaults(self) -> CardDefaults {
        use PaymentTerms::*;
        let (limit_type, transaction_count, renewal_frequency) = match self {
            DueOnReceipt | Net30 | Net60 | Net90 => {
                (LimitType::OneTime, TransactionCount::One, None)
            }
            TwoInstallments | ThreeInstallments | FourInstallments => {
                (LimitType::OneTime, TransactionCount::Unlimited, None)
            }
            MonthlyRecurring => (
                LimitType::Recurring,
                TransactionCount::Unlimited,
                Some(RenewalFrequency::Month),
            ),
            QuarterlyRecurring => (
                LimitType::Recurring,
                TransactionCount::Unlimited,
                Some(RenewalFrequency::Quarter),
            ),
            YearlyRecurring => (
                LimitType::Recurring,
                TransactionCount::Unlimited,
                Some(RenewalFrequency::Year),
            ),
        };
        CardDefaults {
            limit_type,
            transaction_count,
            renewal_frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub vendor_name: String,
    pub vendor_email: Option<String>,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub description: Option<String>,
    /// Free-form label of the method chosen in the UI
    pub payment_method: Option<String>,
    pub payment_terms: PaymentTerms,
    /// Card this invoice is bound to; makes the invoice read-only except for status
    pub locked_card_id: Option<CardId>,
    /// Method used for the first payment attempt; later attempts must match
    pub first_payment_method: Option<PaymentMethod>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn from_new(id: InvoiceId, new: NewInvoice, now: DateTime<Utc>) -> Self {
        Invoice {
            id,
            invoice_number: new.invoice_number,
            vendor_name: new.vendor_name,
            vendor_email: new.vendor_email,
            amount: new.amount,
            due_date: new.due_date,
            status: new.status.unwrap_or(InvoiceStatus::Pending),
            description: new.description,
            payment_method: new.payment_method,
            payment_terms: new.payment_terms,
            locked_card_id: None,
            first_payment_method: None,
            approved_by: new.approved_by,
            approved_at: None,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub invoice_number: String,
    pub vendor_name: String,
    #[serde(default)]
    pub vendor_email: Option<String>,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    #[serde(default)]
    pub approved_by: Option<String>,
}

/// Partial update of an invoice
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceUpdate {
    pub status: Option<InvoiceStatus>,
    pub invoice_number: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_email: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub payment_method: Option<String>,
    pub payment_terms: Option<PaymentTerms>,
    pub approved_by: Option<String>,
    /// Every key the request body named other than `status`
    #[serde(skip)]
    pub named_fields: Vec<String>,
}

/// Keys of a JSON update body other than `status`, sorted
///
/// Null values, read-only columns and unknown keys all count.
pub fn non_status_keys(body: &Map<String, Value>) -> Vec<String> {
    body.keys().filter(|key| *key != "status").cloned().collect()
}

/// Merge the typed field list with the keys the body named
pub(crate) fn merge_named(mut fields: Vec<String>, named: &[String]) -> Vec<String> {
    for key in named {
        if !fields.contains(key) {
            fields.push(key.clone());
        }
    }
    fields
}

impl InvoiceUpdate {
    /// Parse a request body, remembering every key it named
    pub fn from_body(body: Map<String, Value>) -> Result<Self, LedgerError> {
        let named_fields = non_status_keys(&body);
        let mut update: Self = serde_json::from_value(Value::Object(body))
            .map_err(|e| LedgerError::validation(format!("Invalid invoice update: {}", e)))?;
        update.named_fields = named_fields;
        Ok(update)
    }

    /// Names of the non-status fields in the update, as sent over the wire
    pub fn non_status_fields(&self) -> Vec<String> {
        let present = [
            ("invoiceNumber", self.invoice_number.is_some()),
            ("vendorName", self.vendor_name.is_some()),
            ("vendorEmail", self.vendor_email.is_some()),
            ("amount", self.amount.is_some()),
            ("dueDate", self.due_date.is_some()),
            ("description", self.description.is_some()),
            ("paymentMethod", self.payment_method.is_some()),
            ("paymentTerms", self.payment_terms.is_some()),
            ("approvedBy", self.approved_by.is_some()),
        ];
        let fields = present
            .iter()
            .filter(|(_, is_set)| *is_set)
            .map(|(name, _)| name.to_string())
            .collect();
        merge_named(fields, &self.named_fields)
    }

    /// Apply every present field to `invoice`
    pub fn apply(self, invoice: &mut Invoice, now: DateTime<Utc>) {
        if let Some(v) = self.status {
            if v == InvoiceStatus::Approved && invoice.approved_at.is_none() {
                invoice.approved_at = Some(now);
            }
            invoice.status = v;
        }
        if let Some(v) = self.invoice_number {
            invoice.invoice_number = v;
        }
        if let Some(v) = self.vendor_name {
            invoice.vendor_name = v;
        }
        if let Some(v) = self.vendor_email {
            invoice.vendor_email = Some(v);
        }
        if let Some(v) = self.amount {
            invoice.amount = v;
        }
        if let Some(v) = self.due_date {
            invoice.due_date = v;
        }
        if let Some(v) = self.description {
            invoice.description = Some(v);
        }
        if let Some(v) = self.payment_method {
            invoice.payment_method = Some(v);
        }
        if let Some(v) = self.payment_terms {
            invoice.payment_terms = v;
        }
        if let Some(v) = self.approved_by {
            invoice.approved_by = Some(v);
        }
    }
}
