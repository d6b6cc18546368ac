//! REST surface
//!
//! Thin axum layer over [`Ledger`]: handlers deserialize the request, call one
//! service operation and map `LedgerError` through [`ApiError`].

mod error;
pub mod handlers;
pub mod middleware;

pub use error::ApiError;

use axum::{
    http::HeaderValue,
    routing::{get, patch, post},
    Router,
};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use crate::core::{InMemoryLedger, Ledger, LedgerConfig};
use handlers::{approvals, cards, invoices, payments, simulate, transactions, wallet};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger<InMemoryLedger>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &LedgerConfig) -> Self {
        Self::with_ledger(Ledger::in_memory(config))
    }

    pub fn with_ledger(ledger: Ledger<InMemoryLedger>) -> Self {
        Self {
            ledger,
            started_at: Instant::now(),
        }
    }
}

/// Permissive when no origins are configured
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route(
            "/cards/:id",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/cards/:id/lock", post(cards::lock_card))
        .route("/cards/:id/unlock", post(cards::unlock_card))
        .route("/cards/:id/suspend", post(cards::suspend_card))
        .route("/cards/:id/auto-suspend", get(cards::auto_suspend))
        .route("/cards/:id/transactions", get(cards::card_transactions))
        .route(
            "/card-approvals",
            get(approvals::list_approvals).post(approvals::create_approval),
        )
        .route("/card-approvals/pending", get(approvals::pending_approvals))
        .route("/card-approvals/:id", patch(approvals::decide_approval))
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice).patch(invoices::update_invoice),
        )
        .route("/invoices/:id/update-status", post(invoices::refresh_status))
        .route("/invoices/:id/payments", get(invoices::invoice_payments))
        .route("/invoices/:id/pay", post(invoices::pay_invoice))
        .route("/payments", post(payments::create_payment))
        .route("/payments/:id", patch(payments::update_payment))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/sync", post(transactions::sync_transactions))
        .route("/transactions/export", get(transactions::export_transactions))
        .route("/transactions/coding-import", post(transactions::import_coding))
        .route(
            "/transactions/:id",
            get(transactions::get_transaction).patch(transactions::code_transaction),
        )
        .route("/simulate/transaction", post(simulate::simulate_transaction))
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/add-funds", post(wallet::add_funds))
        .route("/wallet/debit", post(wallet::debit))
        .route("/reports/summary", get(handlers::summary))
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(cors)
        .with_state(state)
}
