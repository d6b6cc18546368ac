// CLI module
// Server configuration from flags, environment and .env files

mod args;

pub use args::{CliArgs, LogFormat};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// Each option falls back to its `CARD_LEDGER_*` environment variable, so a
/// `.env` file loaded beforehand configures the server as well. On invalid
/// arguments or `--help`, clap prints the message and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
