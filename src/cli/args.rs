use crate::core::{AutoSuspendPolicy, LedgerConfig};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;

/// Serve the card and invoice ledger over HTTP
#[derive(Parser, Debug)]
#[command(name = "card-ledger")]
#[command(about = "Virtual card, invoice and wallet ledger service", long_about = None)]
pub struct CliArgs {
    /// Interface to bind
    #[arg(long, env = "CARD_LEDGER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CARD_LEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Wallet balance the ledger starts with
    #[arg(
        long = "initial-balance",
        env = "CARD_LEDGER_INITIAL_BALANCE",
        value_name = "AMOUNT",
        default_value = "0"
    )]
    pub initial_balance: Decimal,

    /// Whether exhausted one-time cards are suspended by the authorizer
    #[arg(
        long = "auto-suspend",
        env = "CARD_LEDGER_AUTO_SUSPEND",
        value_name = "POLICY",
        default_value = "advisory",
        help = "Auto-suspend policy: 'advisory' reports only, 'enforce' suspends the card"
    )]
    pub auto_suspend: AutoSuspendPolicy,

    /// Log output format
    #[arg(
        long = "log-format",
        env = "CARD_LEDGER_LOG_FORMAT",
        value_name = "FORMAT",
        default_value = "pretty"
    )]
    pub log_format: LogFormat,

    /// Allowed CORS origins; any origin is allowed when empty
    #[arg(
        long = "cors-origins",
        env = "CARD_LEDGER_CORS_ORIGINS",
        value_name = "ORIGINS",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl CliArgs {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the `LedgerConfig`, falling back to defaults for invalid values
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig::new(self.initial_balance, self.auto_suspend)
    }
}
