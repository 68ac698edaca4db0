//! Utility functions for the MQTT browser.
//!
//! Client ID generation, QoS conversion, word wrapping and the timing constants shared
//! by the gateway and the binary.

use rumqttc::QoS;
use std::time::Duration;

/// Timeout in seconds for graceful MQTT disconnect operations.
pub const DISCONNECT_TIMEOUT_SECS: u64 = 2;

/// Pause between reconnect attempts after the event loop reports an error.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Prefix of generated client identifiers.
pub const CLIENT_ID_PREFIX: &str = "mqtt-browser-";

/// Convert a u8 value to a QoS level, or `None` if it is out of range.
#[must_use]
pub fn u8_to_qos(qos: u8) -> Option<QoS> {
    match qos {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// Generate a client ID from an optional string.
///
/// If `client_id` is `Some` and non-empty it is returned unchanged. Otherwise a unique
/// identifier is derived from the current time.
#[must_use]
pub fn generate_client_id(client_id: &Option<String>) -> String {
    match client_id {
        Some(id) if !id.trim().is_empty() => id.clone(),
        _ => {
            use std::time::{SystemTime, UNIX_EPOCH};
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            let hash = timestamp ^ (timestamp >> 32);
            format!("{}{:08x}", CLIENT_ID_PREFIX, hash as u32)
        }
    }
}

/// Word-wrap `text` into lines of at most `width` characters.
///
/// Runs of whitespace collapse to one space. Words longer than `width` are split across
/// lines. Always returns at least one (possibly empty) line.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        if line_len > 0 && line_len + 1 + chars.len() <= width {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + chars.len();
            continue;
        }
        for chunk in chars.chunks(width) {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
            }
            line = chunk.iter().collect();
            line_len = chunk.len();
        }
    }

    if line_len > 0 || lines.is_empty() {
        lines.push(line);
    }
    lines
}
