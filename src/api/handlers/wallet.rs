use axum::{extract::State, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

pub async fn get_wallet(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.wallet.wallet()?))
}

/// Positive amounts fund the wallet; negative amounts take the guarded debit path
pub async fn add_funds(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.ledger.wallet.add_funds(request.amount)?;
    Ok(Json(json!({ "balance": balance })))
}

pub async fn debit(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let balance = state.ledger.wallet.debit(request.amount)?;
    Ok(Json(json!({ "balance": balance })))
}
