//! # Membership - Application Review Server
//!
//! The main binary for the membership application review service.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for submitting and reviewing applications
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/membership (THE BINARY)          │
//! │                                                      │
//! │   ┌─────────────┐   ┌─────────────┐   ┌──────────┐   │
//! │   │    CLI      │   │  HTTP API   │   │  Config  │   │
//! │   │   (clap)    │   │   (axum)    │   │  (toml)  │   │
//! │   └──────┬──────┘   └──────┬──────┘   └────┬─────┘   │
//! │          └─────────────────┼───────────────┘         │
//! │                            ▼                         │
//! │                  ┌──────────────────┐                │
//! │                  │ membership-core  │                │
//! │                  │   (THE LOGIC)    │                │
//! │                  └──────────────────┘                │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! membership server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! membership submit --user member@example.org --profile profile.json
//! membership approve APP-2025-001 --role block_admin --notes "documents verified"
//! membership show APP-2025-001
//! ```

use clap::Parser;
use membership::cli;
use membership::config::{LogFormat, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let (settings, warnings) = match Settings::load(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&settings, cli.verbose);
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, settings).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// RUST_LOG wins over the configured filter; `--verbose` raises the default
/// to debug.
fn init_tracing(settings: &Settings, verbose: bool) {
    let fallback = if verbose {
        "membership=debug,membership_core=debug,tower_http=debug".to_string()
    } else {
        settings.logging.filter.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match settings.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  Membership Review Server v{}

  Block → District → State → Payment
"#,
        env!("CARGO_PKG_VERSION")
    );
}
