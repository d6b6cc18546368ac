//! Card Ledger server
//!
//! Serves the virtual card, invoice and wallet ledger over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --port 8080 --initial-balance 10000
//! cargo run -- --auto-suspend enforce --log-format json
//! CARD_LEDGER_CORS_ORIGINS=http://localhost:3000 cargo run
//! ```
//!
//! Every flag also reads a `CARD_LEDGER_*` environment variable, and a `.env`
//! file in the working directory is loaded before parsing. `RUST_LOG`
//! controls log filtering (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Clean shutdown after Ctrl-C
//! - 1: Error (invalid arguments, address in use, runtime failure, etc.)

use anyhow::Context;
use card_ledger::api::{cors_layer, create_app, AppState};
use card_ledger::cli::{self, LogFormat};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::parse_args();
    init_tracing(args.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let config = args.to_ledger_config();
        let state = AppState::new(&config);
        let app = create_app(state, cors_layer(&args.cors_origins));

        let addr = args.bind_address();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(
            addr = %addr,
            opening_balance = %config.opening_balance,
            auto_suspend = ?config.auto_suspend,
            "Card ledger listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        tracing::info!("Card ledger stopped");
        Ok::<(), anyhow::Error>(())
    })
}

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
