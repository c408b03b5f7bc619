//! Termwise -- terminal assistant backend.
//!
//! This is the application entry point. It wires together all modules:
//!   - Configuration loading
//!   - Database initialization
//!   - Gemini completion client
//!   - Quota guard + audit logger
//!   - HTTP server
//!   - Graceful shutdown on SIGTERM / SIGINT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use termwise::AppState;
use termwise::auth::google::GoogleOAuth;
use termwise::config::Config;
use termwise::db::Database;
use termwise::gemini::GeminiClient;
use termwise::quota::{QuotaGuard, spawn_audit_logger};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("termwise.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("termwise {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
termwise {version} -- Terminal assistant backend

USAGE:
    termwise [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: termwise.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    TERMWISE_CONFIG        Alternative to --config flag
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();

    // Allow TERMWISE_CONFIG env var as alternative to --config flag
    let config_path = std::env::var("TERMWISE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    // 2. Load configuration
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting termwise"
    );

    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!(
            "auth.jwt_secret is not set; configure it in {} or via TERMWISE_JWT_SECRET",
            config_path.display()
        );
    }
    if config.gemini.api_key.is_empty() {
        tracing::warn!("gemini.api_key is not set -- completion calls will be rejected upstream");
    }

    // 4. Open database
    let db = Database::open(&config.database.path)?;
    tracing::info!(path = %config.database.path.display(), "Database opened");

    // 5. Build the completion client
    let gemini = Arc::new(GeminiClient::new(
        config.gemini.endpoint.clone(),
        config.gemini.api_key.clone(),
        Duration::from_secs(config.gemini.timeout_secs),
    )?);

    // 6. Quota guard
    let quota = Arc::new(QuotaGuard::new(db.clone(), config.quota.daily_limit));

    // 7. Google OAuth client for the token flow
    let google = Arc::new(GoogleOAuth::new(config.google.clone()));
    if !config.google.is_configured() {
        tracing::warn!("Google OAuth is not configured -- token issuance will fail");
    }

    // 8. Audit channel + background logger
    let (audit_tx, audit_rx) = tokio::sync::mpsc::unbounded_channel();
    let _audit_handle = spawn_audit_logger(db.clone(), audit_rx);
    tracing::debug!("Audit logger spawned");

    // 9. Shared application state
    let state = AppState {
        config: Arc::new(config.clone()),
        db,
        gemini,
        quota,
        google,
        audit_tx,
    };

    // 10. Build the router
    let app = termwise::app(state);

    // 11. Bind and serve
    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Listening");

    println!();
    println!("  termwise v{} is running", env!("CARGO_PKG_VERSION"));
    println!("  Prompt:  http://{listen_addr}/prompt");
    println!("  Health:  http://{listen_addr}/health");
    println!();

    // 12. Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully");
    // Dropping the audit sender lets the logger drain remaining entries.

    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber based on configuration.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        // Set termwise crate to the configured level, dependencies to warn
        EnvFilter::new(format!("termwise={level},tower_http={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

/// Wait for a shutdown signal (SIGTERM or SIGINT / Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_usage_does_not_panic() {
        // Just verify it doesn't panic.
        print_usage();
    }
}
