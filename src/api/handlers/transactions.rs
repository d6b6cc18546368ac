use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState};
use crate::types::{Transaction, TransactionCoding, TransactionId, TransactionStatus};

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub synced: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub transactions: Vec<Transaction>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> impl IntoResponse {
    Json(state.ledger.transactions.transactions(query.status))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.transactions.transaction(transaction_id)?))
}

/// Attach coding and receipt; the status is re-derived from the result
pub async fn code_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
    Json(coding): Json<TransactionCoding>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.transactions.code(transaction_id, coding)?))
}

pub async fn sync_transactions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.ledger.transactions.sync_ready()?;
    Ok(Json(SyncResult {
        synced: transactions.len(),
        transactions,
    }))
}

pub async fn export_transactions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let mut buffer = Vec::new();
    let rows = state.ledger.transactions.export_ready(&mut buffer)?;
    tracing::debug!(rows, "Ready-to-sync export rendered");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        buffer,
    ))
}

/// Body is the coding CSV itself
pub async fn import_coding(
    State(state): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.ledger.transactions.import_coding(body.as_bytes())?;
    Ok(Json(ImportResult {
        imported: transactions.len(),
        transactions,
    }))
}
