//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::types::LedgerError;

/// A `LedgerError` on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::Validation { .. }
            | LedgerError::Conflict { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::ArithmeticOverflow { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let mut body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        if let LedgerError::Conflict { blocked_fields, .. } = &self.0 {
            if !blocked_fields.is_empty() {
                body["blockedFields"] = json!(blocked_fields);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    #[case::validation(LedgerError::validation("bad"), StatusCode::BAD_REQUEST)]
    #[case::not_found(LedgerError::not_found("Card", 1), StatusCode::NOT_FOUND)]
    #[case::conflict(LedgerError::conflict("locked"), StatusCode::BAD_REQUEST)]
    #[case::funds(
        LedgerError::insufficient_funds(Decimal::ONE, Decimal::TEN),
        StatusCode::BAD_REQUEST
    )]
    #[case::persistence(LedgerError::persistence("down"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_mapping(#[case] error: LedgerError, #[case] expected: StatusCode) {
        assert_eq!(ApiError(error).into_response().status(), expected);
    }
}
