use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::{ApiError, AppState};
use crate::core::{CardPaymentOutcome, FundingSource, InvoiceCardSpec};
use crate::types::{InvoiceId, InvoiceUpdate, NewInvoice, PaymentMethod};

/// Body of `POST /invoices/:id/pay`, tagged by `method`
///
/// Card options for the issued card go under `card`.
#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PayInvoiceRequest {
    Card {
        #[serde(default)]
        card: InvoiceCardSpec,
    },
    SharedCard {
        #[serde(rename = "vendorEmail")]
        vendor_email: String,
        #[serde(default)]
        card: InvoiceCardSpec,
    },
    Ach {
        /// Defaults to the outstanding amount
        #[serde(default)]
        amount: Option<Decimal>,
        #[serde(default)]
        source: FundingSource,
    },
    Check {
        #[serde(default)]
        amount: Option<Decimal>,
        #[serde(default)]
        source: FundingSource,
    },
}

pub async fn list_invoices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.invoices.invoices())
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(new): Json<NewInvoice>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = state.ledger.invoices.create_invoice(new)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<InvoiceId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.invoices.invoice(invoice_id)?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<InvoiceId>,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let update = InvoiceUpdate::from_body(body)?;
    Ok(Json(state.ledger.invoices.update_invoice(invoice_id, update)?))
}

pub async fn refresh_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<InvoiceId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.invoices.refresh_status(invoice_id)?))
}

pub async fn invoice_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<InvoiceId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.invoices.payments(invoice_id)?))
}

pub async fn pay_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<InvoiceId>,
    Json(request): Json<PayInvoiceRequest>,
) -> Result<Json<Value>, ApiError> {
    let payments = &state.ledger.invoice_payments;
    let body = match request {
        PayInvoiceRequest::Card { card } => {
            match payments.pay_via_immediate_charge(invoice_id, card)? {
                CardPaymentOutcome::Paid {
                    card,
                    invoice,
                    payment,
                    charge,
                } => json!({
                    "approved": true,
                    "card": card,
                    "invoice": invoice,
                    "payment": payment,
                    "transaction": charge.transaction,
                    "newWalletBalance": charge.new_wallet_balance,
                }),
                CardPaymentOutcome::Declined {
                    card,
                    invoice,
                    reason,
                } => json!({
                    "approved": false,
                    "declined": true,
                    "declineReason": reason,
                    "card": card,
                    "invoice": invoice,
                }),
            }
        }
        PayInvoiceRequest::SharedCard { vendor_email, card } => {
            let (card, invoice) = payments.pay_via_shared_card(invoice_id, card, &vendor_email)?;
            json!({ "card": card, "invoice": invoice })
        }
        PayInvoiceRequest::Ach { amount, source } => {
            bank_payment(&state, invoice_id, amount, PaymentMethod::Ach, source)?
        }
        PayInvoiceRequest::Check { amount, source } => {
            bank_payment(&state, invoice_id, amount, PaymentMethod::Check, source)?
        }
    };
    Ok(Json(body))
}

fn bank_payment(
    state: &AppState,
    invoice_id: InvoiceId,
    amount: Option<Decimal>,
    method: PaymentMethod,
    source: FundingSource,
) -> Result<Value, ApiError> {
    let amount = match amount {
        Some(amount) => amount,
        None => state.ledger.invoices.outstanding(invoice_id)?,
    };
    let paid = state
        .ledger
        .invoice_payments
        .pay_via_ach_or_check(invoice_id, amount, method, source)?;
    Ok(json!({
        "invoice": paid.invoice,
        "payment": paid.payment,
        "transaction": paid.transaction,
        "newWalletBalance": paid.new_wallet_balance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_request_tags() {
        let card: PayInvoiceRequest = serde_json::from_value(
            json!({"method": "card", "card": {"cardholderName": "Ops"}}),
        )
        .unwrap();
        assert!(matches!(
            card,
            PayInvoiceRequest::Card { card } if card.cardholder_name.as_deref() == Some("Ops")
        ));

        let shared: PayInvoiceRequest = serde_json::from_value(
            json!({"method": "shared_card", "vendorEmail": "ap@vendor.test"}),
        )
        .unwrap();
        assert!(matches!(
            shared,
            PayInvoiceRequest::SharedCard { ref vendor_email, .. } if vendor_email == "ap@vendor.test"
        ));

        let ach: PayInvoiceRequest =
            serde_json::from_value(json!({"method": "ach", "source": "external"})).unwrap();
        assert!(matches!(
            ach,
            PayInvoiceRequest::Ach {
                amount: None,
                source: FundingSource::External
            }
        ));
    }
}
