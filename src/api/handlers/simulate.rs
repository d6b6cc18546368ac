use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::api::{ApiError, AppState};
use crate::core::{Authorization, ChargeRequest};

/// Run a charge through the authorizer
///
/// Declines are a normal 200 response carrying `declineReason`.
pub async fn simulate_transaction(
    State(state): State<AppState>,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<Value>, ApiError> {
    let body = match state.ledger.authorizer.authorize(request)? {
        Authorization::Approved(charge) => json!({
            "approved": true,
            "transaction": charge.transaction,
            "newWalletBalance": charge.new_wallet_balance,
            "newCardSpend": charge.new_card_spend,
            "monthlyReset": charge.monthly_reset,
            "autoSuspend": charge.auto_suspend,
            "cardSuspended": charge.suspended,
        }),
        Authorization::Declined { reason } => json!({
            "approved": false,
            "declined": true,
            "declineReason": reason,
        }),
    };
    Ok(Json(body))
}
