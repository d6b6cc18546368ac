pub mod approvals;
pub mod cards;
pub mod invoices;
pub mod payments;
pub mod simulate;
pub mod transactions;
pub mod wallet;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::{ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.summary()?))
}
