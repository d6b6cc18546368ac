use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, AppState};
use crate::types::{ApprovalDecision, ApprovalId, Card, CardApproval, NewApproval};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub status: ApprovalDecision,
    #[serde(default)]
    pub approver_name: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub approval: CardApproval,
    pub card: Card,
}

pub async fn list_approvals(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.approvals.approvals())
}

pub async fn pending_approvals(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.approvals.pending())
}

pub async fn create_approval(
    State(state): State<AppState>,
    Json(new): Json<NewApproval>,
) -> Result<impl IntoResponse, ApiError> {
    let approval = state.ledger.approvals.create_approval(new)?;
    Ok((StatusCode::CREATED, Json(approval)))
}

pub async fn decide_approval(
    State(state): State<AppState>,
    Path(approval_id): Path<ApprovalId>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (approval, card) = state.ledger.approvals.decide(
        approval_id,
        request.status,
        request.approver_name.trim(),
        request.comments,
    )?;
    Ok(Json(DecisionResponse { approval, card }))
}
