//! MQTT Browser Library
//!
//! This library provides the core of the MQTT browser: topic discovery, subscription
//! reconciliation, the message stream and the two-pane terminal UI that ties them
//! together. The UI only ever talks to the broker through the [`gateway::Gateway`] trait,
//! so the whole state machine can be driven without a network.

pub mod cli;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod mqtt;
pub mod subscriptions;
pub mod topics;
pub mod tui;
pub mod util;
