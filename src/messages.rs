//! Message stream module
//!
//! Holds the messages received from subscribed topics in arrival order and the scroll
//! cursor of the messages pane.
//!
//! The buffer grows without bound for the lifetime of the session; only an explicit
//! [`MessageBuffer::reset`] releases it.
//!
//! # Auto-follow
//!
//! When a message is appended the cursor jumps to the new tail if either the messages
//! pane has focus, or the cursor was no more than `follow_margin` positions behind the
//! previous tail position. A user who scrolled further back keeps their place.

use crate::util::wrap_text;
use chrono::{DateTime, Local};

/// Default number of positions behind the tail that still counts as "following".
pub const DEFAULT_FOLLOW_MARGIN: usize = 5;

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload bytes, never interpreted by the core.
    pub payload: Vec<u8>,
    /// Local time the message was received.
    pub received_at: DateTime<Local>,
}

impl Message {
    /// Create a message stamped with the current local time.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::received(topic, payload, Local::now())
    }

    /// Create a message with an explicit receive time.
    pub fn received(
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        received_at: DateTime<Local>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at,
        }
    }

    /// Single-line rendition of the payload for the messages pane.
    ///
    /// JSON documents are re-serialized compactly; anything else is decoded as lossy
    /// UTF-8 with line breaks and other control characters replaced by spaces.
    pub fn payload_preview(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.payload) {
            if value.is_object() || value.is_array() {
                return value.to_string();
            }
        }
        String::from_utf8_lossy(&self.payload)
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect()
    }

    /// The payload preview wrapped to `width` columns.
    pub fn payload_lines(&self, width: usize) -> Vec<String> {
        wrap_text(&self.payload_preview(), width)
    }

    /// Lines the message occupies at `width`: its header plus the wrapped payload.
    pub fn height(&self, width: usize) -> usize {
        1 + self.payload_lines(width).len()
    }
}

/// Append-only message log with a scroll cursor.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    messages: Vec<Message>,
    scroll: usize,
    capacity: usize,
    follow_margin: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_MARGIN)
    }
}

impl MessageBuffer {
    /// Create an empty buffer with the given follow margin and a one-row viewport.
    pub fn new(follow_margin: usize) -> Self {
        Self {
            messages: Vec::new(),
            scroll: 0,
            capacity: 1,
            follow_margin,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Index of the first visible message.
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Number of messages the pane can show at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn follow_margin(&self) -> usize {
        self.follow_margin
    }

    /// Highest cursor value that still fills the viewport.
    pub fn max_scroll(&self) -> usize {
        self.messages.len().saturating_sub(self.capacity)
    }

    /// Update the viewport height. A cursor sitting on the tail stays on the tail.
    pub fn set_capacity(&mut self, capacity: usize) {
        let following = self.scroll >= self.max_scroll();
        self.capacity = capacity.max(1);
        self.scroll = if following {
            self.max_scroll()
        } else {
            self.scroll.min(self.max_scroll())
        };
    }

    /// Append a message, applying the auto-follow rule.
    pub fn append(&mut self, message: Message, pane_focused: bool) {
        let previous_tail = self.max_scroll();
        let near_tail = previous_tail.saturating_sub(self.scroll) <= self.follow_margin;
        self.messages.push(message);
        if pane_focused || near_tail {
            self.scroll = self.max_scroll();
        }
    }

    /// Drop every message and return the cursor to the top.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.scroll = 0;
    }

    /// Move the cursor by `delta` rows, clamped to the scrollable range.
    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.scroll.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll.saturating_add(delta as usize)
        };
        self.scroll = target.min(self.max_scroll());
    }

    /// Up to `capacity` consecutive messages starting at the cursor, never running past
    /// the end of the stream.
    pub fn visible_window(&self, capacity: usize) -> &[Message] {
        let len = self.messages.len();
        let start = self.scroll.min(len.saturating_sub(capacity));
        let end = start.saturating_add(capacity).min(len);
        &self.messages[start..end]
    }

    /// The window for the current viewport height.
    pub fn visible(&self) -> &[Message] {
        self.visible_window(self.capacity)
    }
}
