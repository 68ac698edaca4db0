//! MQTT Browser - Explore MQTT topics and messages in the terminal
//!
//! Connects to a broker, discovers the topics that are being published, and lets the
//! user subscribe to any of them from a two-pane terminal UI.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success (including graceful shutdown) |
//! | 1 | Configuration/argument error |
//! | 2 | TLS setup error |
//! | 3 | File I/O error |

use clap::Parser;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mqtt_browser::cli::Args;
use mqtt_browser::error::MqttBrowserError;
use mqtt_browser::gateway::Gateway;
use mqtt_browser::mqtt::MqttGateway;
use mqtt_browser::tui::{run_browser, should_enable_interactive, BrowserState};

/// Exit code for success (including graceful shutdown)
const EXIT_SUCCESS: u8 = 0;
/// Exit code for configuration/argument errors
const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for TLS setup errors
const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for file I/O errors
const EXIT_IO_ERROR: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = Args::parse();
    args.apply_defaults();

    if let Err(e) = args.validate() {
        eprintln!("Error: Configuration error: {}", e);
        eprintln!("  Hint: Use --help for usage information");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    match run(args).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(error_to_exit_code(&e))
        }
    }
}

/// Set up tracing. The terminal belongs to the UI, so logs go to `log_file` or nowhere.
fn init_logging(log_file: Option<&Path>) -> Result<(), MqttBrowserError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

/// Main application logic.
///
/// Builds the gateway from the arguments, runs the browser until the user quits or a
/// shutdown signal arrives, then disconnects cleanly.
async fn run(args: Args) -> Result<(), MqttBrowserError> {
    init_logging(args.log_file.as_deref())?;

    if !should_enable_interactive() {
        return Err(MqttBrowserError::InvalidArgument(
            "mqtt-browser needs an interactive terminal on stdout".to_string(),
        ));
    }

    let browser_config = args.browser_config()?;
    let gateway_config = args.gateway_config()?;
    info!(
        broker = %gateway_config.address,
        client_id = %gateway_config.client_id,
        authenticated = gateway_config.has_credentials(),
        preset = browser_config.preset.topics().len(),
        "Starting MQTT browser"
    );

    let (mut gateway, mut events) = MqttGateway::new(gateway_config)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            warn!(error = %e, "Error setting up signal handler");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    let mut state = BrowserState::new(browser_config);
    let result = run_browser(&mut state, &mut gateway, &mut events, shutdown_rx).await;

    if !state.is_quit_requested() {
        gateway.disconnect();
    }
    println!("Disconnecting from MQTT broker...");
    gateway.close().await;
    println!("Goodbye!");

    result.map_err(MqttBrowserError::Io)
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM signals.
///
/// In raw mode Ctrl+C arrives as a key press instead, so in practice this catches
/// SIGTERM and signals sent before the terminal was taken over.
async fn wait_for_shutdown_signal() -> Result<(), MqttBrowserError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(MqttBrowserError::Io)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(MqttBrowserError::Io)?;

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map_err(MqttBrowserError::Io)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

/// Map an error to the process exit code.
fn error_to_exit_code(error: &MqttBrowserError) -> u8 {
    match error {
        MqttBrowserError::InvalidArgument(_) => EXIT_CONFIG_ERROR,
        MqttBrowserError::Tls(_) => EXIT_CONNECTION_ERROR,
        MqttBrowserError::Io(_) => EXIT_IO_ERROR,
        MqttBrowserError::Json(_) => EXIT_IO_ERROR,
    }
}
