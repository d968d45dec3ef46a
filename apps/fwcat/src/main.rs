//! # fwcat - Framework Catalog & Installer
//!
//! ## Usage
//!
//! ```bash
//! # Resolve the catalog and list installable frameworks
//! fwcat -d frameworks.toml list
//!
//! # Install one framework at a commit
//! fwcat setup flaml c66f8d
//!
//! # Install everything, four at a time
//! fwcat install --jobs 4
//! ```
//!
//! `RUST_LOG` controls the log filter; `FWCAT_LOG_FORMAT=json` switches
//! log output to JSON lines.

use clap::Parser;
use fwcat::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // FWCAT_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("FWCAT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "fwcat=debug,fwcat_core=debug"
    } else {
        "fwcat=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

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

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = ?e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the fwcat startup banner.
fn print_banner() {
    eprintln!("fwcat v{} - framework catalog & installer", env!("CARGO_PKG_VERSION"));
}
