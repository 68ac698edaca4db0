//! Error module
//!
//! Defines the error types of the MQTT browser using `thiserror`.
//!
//! Two families live here:
//!
//! - [`MqttBrowserError`]: failures while bootstrapping the process (argument
//!   validation, TLS material, preset files). These end the process with an exit code.
//! - [`BrowserFault`]: failures reported by the broker gateway while the browser runs.
//!   None of them is fatal; the most recent one is shown in the status line until a
//!   later operation succeeds.

use thiserror::Error;

/// The main error type for starting the MQTT browser.
///
/// # Example
///
/// ```rust,ignore
/// use mqtt_browser::error::MqttBrowserError;
///
/// fn example() -> Result<(), MqttBrowserError> {
///     let file = std::fs::File::open("topics.json")?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum MqttBrowserError {
    /// General I/O error (terminal setup, preset and log files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error for the subscription preset file.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line argument or environment value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// TLS configuration error, such as an unreadable CA certificate.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// A runtime failure reported by the broker gateway.
///
/// The rendered text of the most recent fault is what the browser keeps as its
/// "last error". Subscription faults never touch the user's desired flags.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserFault {
    /// The initial connection (or a reconnect attempt) failed.
    #[error("MQTT Error: connection failed: {0}")]
    Connection(String),

    /// An established connection dropped.
    #[error("MQTT Error: connection lost: {0}")]
    ConnectionLost(String),

    /// The wildcard discovery subscription could not be issued.
    #[error("MQTT Error: topic discovery failed: {0}")]
    Discovery(String),

    /// Subscribing to a single topic failed.
    #[error("MQTT Error: failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// Unsubscribing from a single topic failed.
    #[error("MQTT Error: failed to unsubscribe from {topic}: {reason}")]
    Unsubscribe { topic: String, reason: String },
}
