//! CLI argument parsing module
//!
//! Handles command-line argument parsing using `clap` derive macros. Connection settings
//! fall back to the `MQTT_*` environment variables, so a shell that already exports them
//! for other MQTT tools needs no flags at all.

use crate::error::MqttBrowserError;
use crate::mqtt::{BrokerAddress, GatewayConfig, TlsConfig, DEFAULT_BROKER_URL};
use crate::topics::SubscriptionPreset;
use crate::tui::BrowserConfig;
use crate::util::u8_to_qos;
use clap::Parser;
use rumqttc::QoS;
use std::path::PathBuf;
use std::time::Duration;

/// Client identifier used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "mqttui";

/// Command-line arguments for the MQTT browser.
///
/// Call [`Args::apply_defaults`] and then [`Args::validate`] after parsing.
///
/// # Example
///
/// ```rust,ignore
/// use clap::Parser;
/// use mqtt_browser::cli::Args;
///
/// let mut args = Args::parse();
/// args.apply_defaults();
/// args.validate()?;
/// ```
#[derive(Parser, Debug)]
#[command(name = "mqtt-browser")]
#[command(about = "Browse MQTT topics and messages in the terminal")]
#[command(version)]
pub struct Args {
    /// MQTT broker URL (tcp://, mqtt://, ssl://, tls:// or mqtts://)
    #[arg(long, env = "MQTT_BROKER", default_value = DEFAULT_BROKER_URL)]
    pub broker: String,

    /// MQTT username
    #[arg(long, env = "MQTT_USERNAME")]
    pub username: Option<String>,

    /// MQTT password
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// MQTT client ID (empty generates a unique one)
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Path to CA certificate (TLS brokers only)
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// QoS level for topic subscriptions (0, 1, or 2)
    #[arg(long, default_value = "0")]
    pub qos: u8,

    /// Topic to subscribe at startup (can be specified multiple times)
    #[arg(short = 't', long = "topic")]
    pub topic: Vec<String>,

    /// JSON file containing topics to subscribe at startup
    #[arg(long)]
    pub topics: Option<PathBuf>,

    /// How long topic discovery collects before reporting, in milliseconds
    #[arg(long, default_value = "2000")]
    pub discovery_window_ms: u64,

    /// How far behind the newest message the messages pane may be and still follow it
    #[arg(long, default_value = "5")]
    pub follow_margin: usize,

    /// Write logs to this file (logs are discarded otherwise)
    #[arg(long, env = "MQTT_BROWSER_LOG")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Replace empty values with their defaults.
    ///
    /// An exported but empty `MQTT_BROKER` means the default broker, and blank
    /// credentials mean no authentication.
    pub fn apply_defaults(&mut self) {
        if self.broker.trim().is_empty() {
            self.broker = DEFAULT_BROKER_URL.to_string();
        }
        if self.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
            self.username = None;
        }
        if self.password.as_deref().is_some_and(str::is_empty) {
            self.password = None;
        }
    }

    /// Validate argument values.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the configuration is usable
    /// - `Err(String)` with a descriptive error message otherwise
    pub fn validate(&self) -> Result<(), String> {
        if u8_to_qos(self.qos).is_none() {
            return Err(format!(
                "Invalid QoS level: {}. Must be 0, 1, or 2.",
                self.qos
            ));
        }

        if let Err(e) = BrokerAddress::parse(&self.broker) {
            return Err(e.to_string());
        }

        if self.discovery_window_ms == 0 {
            return Err("--discovery-window-ms must be greater than 0".to_string());
        }

        if self.password.is_some() && self.username.is_none() {
            return Err("--password requires --username".to_string());
        }

        if let Some(ref path) = self.ca_cert {
            if !path.exists() {
                return Err(format!("CA certificate not found: {}", path.display()));
            }
            if BrokerAddress::parse(&self.broker).is_ok_and(|address| !address.tls) {
                return Err(
                    "--ca-cert requires a TLS broker URL (ssl://, tls:// or mqtts://)".to_string(),
                );
            }
        }

        if let Some(ref path) = self.topics {
            if !path.exists() {
                return Err(format!("Topics file not found: {}", path.display()));
            }
        }

        Ok(())
    }

    /// QoS for topic subscriptions. Out-of-range values are rejected by `validate()`.
    pub fn get_qos(&self) -> QoS {
        u8_to_qos(self.qos).unwrap_or(QoS::AtMostOnce)
    }

    pub fn discovery_window(&self) -> Duration {
        Duration::from_millis(self.discovery_window_ms)
    }

    pub fn broker_address(&self) -> Result<BrokerAddress, MqttBrowserError> {
        BrokerAddress::parse(&self.broker)
    }

    /// Gateway settings built from the connection arguments.
    pub fn gateway_config(&self) -> Result<GatewayConfig, MqttBrowserError> {
        let mut config = GatewayConfig::new(self.broker_address()?, self.client_id.clone())
            .with_credentials(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            )
            .with_qos(self.get_qos())
            .with_discovery_window(self.discovery_window());

        if let Some(ref path) = self.ca_cert {
            config = config.with_tls(TlsConfig::new().with_ca_cert(path.clone()));
        }

        Ok(config)
    }

    /// Startup subscriptions: the `--topics` file first, then every `--topic`.
    pub fn preset(&self) -> Result<SubscriptionPreset, MqttBrowserError> {
        let mut preset = match self.topics {
            Some(ref path) => SubscriptionPreset::from_json_file(path)?,
            None => SubscriptionPreset::default(),
        };
        preset.extend(&self.topic);
        Ok(preset)
    }

    /// Browser settings built from the arguments.
    pub fn browser_config(&self) -> Result<BrowserConfig, MqttBrowserError> {
        Ok(BrowserConfig {
            broker_label: self.broker_address()?.to_string(),
            follow_margin: self.follow_margin,
            preset: self.preset()?,
        })
    }
}
