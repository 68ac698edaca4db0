//! Property-based tests for the message stream
//!
//! Covers the auto-follow rule, cursor clamping and reset.

use mqtt_browser::messages::{Message, MessageBuffer};
use proptest::prelude::*;

fn filled(count: usize, capacity: usize, margin: usize) -> MessageBuffer {
    let mut buffer = MessageBuffer::new(margin);
    buffer.set_capacity(capacity);
    for i in 0..count {
        buffer.append(Message::new("t", i.to_string()), false);
    }
    buffer
}

// =============================================================================
// Property 1: auto-follow
// =============================================================================

proptest! {
    #[test]
    fn property_1_follows_within_margin(
        count in 0usize..60,
        capacity in 1usize..10,
        margin in 0usize..8,
        back in 0usize..8,
    ) {
        prop_assume!(back <= margin);
        let mut buffer = filled(count, capacity, margin);
        buffer.scroll_by(-(back as isize));
        buffer.append(Message::new("t", "new"), false);
        prop_assert_eq!(buffer.scroll(), buffer.max_scroll());
    }

    #[test]
    fn property_1_stays_put_beyond_margin(
        count in 20usize..60,
        capacity in 1usize..5,
        margin in 0usize..6,
        extra in 1usize..6,
    ) {
        let mut buffer = filled(count, capacity, margin);
        let back = margin + extra;
        prop_assume!(back <= buffer.max_scroll());
        buffer.scroll_by(-(back as isize));
        let before = buffer.scroll();
        buffer.append(Message::new("t", "new"), false);
        prop_assert_eq!(buffer.scroll(), before);
    }

    #[test]
    fn property_1_focused_pane_always_follows(
        count in 0usize..60,
        capacity in 1usize..10,
        back in 0usize..60,
    ) {
        let mut buffer = filled(count, capacity, 0);
        buffer.scroll_by(-(back as isize));
        buffer.append(Message::new("t", "new"), true);
        prop_assert_eq!(buffer.scroll(), buffer.max_scroll());
        prop_assert_eq!(buffer.visible().last().map(|m| m.payload.as_slice()), Some(&b"new"[..]));
    }
}

// =============================================================================
// Property 2: cursor stays in range and reset empties the stream
// =============================================================================

proptest! {
    #[test]
    fn property_2_scroll_is_clamped(
        count in 0usize..40,
        capacity in 1usize..10,
        deltas in prop::collection::vec(-20isize..20, 0..30),
    ) {
        let mut buffer = filled(count, capacity, 5);
        for delta in deltas {
            buffer.scroll_by(delta);
            prop_assert!(buffer.scroll() <= buffer.max_scroll());
            prop_assert_eq!(buffer.visible().len(), count.min(capacity));
        }
    }

    #[test]
    fn property_2_reset_clears(count in 0usize..40, capacity in 1usize..10) {
        let mut buffer = filled(count, capacity, 5);
        buffer.reset();
        prop_assert!(buffer.is_empty());
        prop_assert_eq!(buffer.scroll(), 0);
        prop_assert!(buffer.visible().is_empty());
    }

    #[test]
    fn property_2_arrival_order_preserved(count in 1usize..40) {
        let buffer = filled(count, 3, 5);
        let payloads: Vec<String> = buffer
            .messages()
            .iter()
            .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
            .collect();
        let expected: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        prop_assert_eq!(payloads, expected);
    }
}
