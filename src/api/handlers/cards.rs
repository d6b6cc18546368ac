use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::{ApiError, AppState};
use crate::core::{AutoSuspendReason, LedgerStore};
use crate::types::{Card, CardApproval, CardId, CardStatus, CardUpdate, NewCard};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCreated {
    #[serde(flatten)]
    pub card: Card,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<CardApproval>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSuspendStatus {
    pub card_id: CardId,
    pub should_suspend: bool,
    pub reason: Option<AutoSuspendReason>,
}

pub async fn list_cards(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger.cards.cards())
}

/// Pending Approval cards come back with their level-1 approval
pub async fn create_card(
    State(state): State<AppState>,
    Json(new): Json<NewCard>,
) -> Result<impl IntoResponse, ApiError> {
    let cards = &state.ledger.cards;
    let created = match new.status.unwrap_or(CardStatus::PendingApproval) {
        CardStatus::PendingApproval => {
            let (card, approval) = cards.request_card(new)?;
            CardCreated {
                card,
                approval: Some(approval),
            }
        }
        _ => CardCreated {
            card: cards.create_card(new)?,
            approval: None,
        },
    };
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.cards.card(card_id)?))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
    Json(body): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, ApiError> {
    let update = CardUpdate::from_body(body)?;
    Ok(Json(state.ledger.cards.update_card(card_id, update)?))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.cards.delete_card(card_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn lock_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.cards.lock_card(card_id)?))
}

pub async fn unlock_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.cards.unlock_card(card_id)?))
}

pub async fn suspend_card(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.cards.suspend_card(card_id)?))
}

pub async fn auto_suspend(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    let (card, reason) = state.ledger.cards.auto_suspend_status(card_id)?;
    Ok(Json(AutoSuspendStatus {
        card_id: card.id,
        should_suspend: reason.is_some(),
        reason,
    }))
}

pub async fn card_transactions(
    State(state): State<AppState>,
    Path(card_id): Path<CardId>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.cards.card(card_id)?;
    Ok(Json(state.ledger.store().transactions_for_card(card_id)))
}
