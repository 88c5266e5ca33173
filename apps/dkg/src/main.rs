//! # dkg
//!
//! Command-line client for a Decentralized Knowledge Graph node.
//!
//! ## Usage
//!
//! ```bash
//! dkg info
//! dkg ual decode did:dkg:otp/0x5cac41237127f94c2d21dae0b14bfefa99880630/42
//! dkg resolve did:dkg:otp/0x5cac41237127f94c2d21dae0b14bfefa99880630/42
//! dkg search "Alice" --limit 10 --timeout 15
//! dkg validate -f assertion.nq
//! ```
//!
//! Logs go to stderr. `RUST_LOG` filters them, `DKG_LOG_FORMAT=json`
//! switches to JSON lines.

use clap::Parser;
use dkg::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // DKG_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("DKG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dkg=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
