use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::api::{ApiError, AppState};
use crate::types::{Invoice, NewPayment, Payment, PaymentId, PaymentUpdate};

/// A payment write together with the invoice it re-derived
#[derive(Debug, Serialize)]
pub struct PaymentWrite {
    pub payment: Payment,
    pub invoice: Invoice,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(new): Json<NewPayment>,
) -> Result<impl IntoResponse, ApiError> {
    let (payment, invoice) = state.ledger.invoices.record_payment(new)?;
    Ok((StatusCode::CREATED, Json(PaymentWrite { payment, invoice })))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
    Json(update): Json<PaymentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let (payment, invoice) = state.ledger.invoices.update_payment(payment_id, update)?;
    Ok(Json(PaymentWrite { payment, invoice }))
}
