//! Topic module
//!
//! Holds the catalog of topics discovered on the broker and the startup preset of
//! topics the user wants subscribed.
//!
//! # Topic Sources
//!
//! Topics enter the catalog from two places:
//! - Discovery summaries posted by the gateway after its wildcard subscription
//! - Topics of messages delivered on regular subscriptions
//!
//! The preset ([`SubscriptionPreset`]) comes from the command line (`-t` / `--topic`) or a
//! JSON file (`--topics`).
//!
//! # Example
//!
//! ```rust,ignore
//! use mqtt_browser::topics::TopicRegistry;
//!
//! let mut registry = TopicRegistry::new();
//! registry.observe("sensors/temp");
//! registry.observe("alarms/door");
//! registry.observe("sensors/temp");
//! assert_eq!(registry.snapshot(), vec!["alarms/door", "sensors/temp"]);
//! ```

use crate::error::MqttBrowserError;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Deduplicated, lexicographically ordered set of discovered topics.
///
/// Topics are never removed during a session.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    topics: BTreeSet<String>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a topic if it is not yet known. Returns true when the catalog changed.
    pub fn observe(&mut self, topic: &str) -> bool {
        if self.topics.contains(topic) {
            return false;
        }
        self.topics.insert(topic.to_string())
    }

    /// Observe every topic of a discovery summary. Returns true when any was new.
    pub fn observe_all<I, S>(&mut self, topics: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        topics
            .into_iter()
            .fold(false, |changed, topic| self.observe(topic.as_ref()) || changed)
    }

    /// The catalog as a sorted sequence.
    pub fn snapshot(&self) -> Vec<String> {
        self.topics.iter().cloned().collect()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Expected JSON format of a preset file:
/// ```json
/// {
///     "topics": ["sensors/temp", "alarms/door"]
/// }
/// ```
#[derive(Debug, serde::Deserialize)]
struct TopicsFile {
    topics: Vec<String>,
}

/// Topics the user asked to be subscribed to from the start of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPreset {
    topics: Vec<String>,
}

impl SubscriptionPreset {
    /// Preset from topics given on the command line. Blank entries are ignored.
    pub fn from_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut preset = Self::default();
        preset.extend(topics);
        preset
    }

    /// Read a preset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened and a JSON error if the content
    /// does not match the expected structure.
    pub fn from_json_file(path: &Path) -> Result<Self, MqttBrowserError> {
        let file = File::open(path)?;
        let topics_file: TopicsFile = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::from_topics(topics_file.topics))
    }

    /// Merge more topics, skipping blanks and duplicates while keeping first-seen order.
    pub fn extend<I, S>(&mut self, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for topic in topics {
            let topic = topic.into();
            let topic = topic.trim();
            if !topic.is_empty() && !self.topics.iter().any(|t| t == topic) {
                self.topics.push(topic.to_string());
            }
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
