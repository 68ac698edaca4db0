//! Property-based tests for the topic registry
//!
//! The catalog must hold every distinct observed topic exactly once, in ascending order,
//! no matter how often or in which order topics arrive.

use mqtt_browser::topics::{SubscriptionPreset, TopicRegistry};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating topic names with one to three levels.
fn topic_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_-]{0,8}",
        "[a-z][a-z0-9]{0,5}/[a-z][a-z0-9]{0,5}",
        "[a-z]{1,3}/[a-z]{1,3}/[a-z0-9]{1,3}",
    ]
}

// =============================================================================
// Property 1: snapshot is sorted and deduplicated
// =============================================================================

proptest! {
    #[test]
    fn property_1_snapshot_sorted_and_unique(topics in prop::collection::vec(topic_strategy(), 0..60)) {
        let mut registry = TopicRegistry::new();
        for topic in &topics {
            registry.observe(topic);
        }

        let expected: Vec<String> = topics.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        prop_assert_eq!(registry.snapshot(), expected);
        prop_assert_eq!(registry.len(), registry.snapshot().len());
    }

    #[test]
    fn property_1_arrival_order_does_not_matter(topics in prop::collection::vec(topic_strategy(), 0..40)) {
        let mut forward = TopicRegistry::new();
        forward.observe_all(&topics);
        let mut backward = TopicRegistry::new();
        backward.observe_all(topics.iter().rev());
        prop_assert_eq!(forward.snapshot(), backward.snapshot());
    }
}

// =============================================================================
// Property 2: observe reports exactly the new topics
// =============================================================================

proptest! {
    #[test]
    fn property_2_observe_reports_first_sighting(topics in prop::collection::vec(topic_strategy(), 1..40)) {
        let mut registry = TopicRegistry::new();
        let mut seen = BTreeSet::new();
        for topic in &topics {
            prop_assert_eq!(registry.observe(topic), seen.insert(topic.clone()));
            prop_assert!(registry.contains(topic));
        }
    }

    #[test]
    fn property_2_observe_all_is_idempotent(topics in prop::collection::vec(topic_strategy(), 0..40)) {
        let mut registry = TopicRegistry::new();
        registry.observe_all(&topics);
        prop_assert!(!registry.observe_all(&topics));
    }
}

// =============================================================================
// Property 3: presets keep first-seen order without duplicates
// =============================================================================

proptest! {
    #[test]
    fn property_3_preset_has_no_duplicates(topics in prop::collection::vec(topic_strategy(), 0..30)) {
        let preset = SubscriptionPreset::from_topics(topics.clone());
        let unique: BTreeSet<&String> = preset.topics().iter().collect();
        prop_assert_eq!(unique.len(), preset.topics().len());

        let mut expected: Vec<String> = Vec::new();
        for topic in topics {
            if !expected.contains(&topic) {
                expected.push(topic);
            }
        }
        prop_assert_eq!(preset.topics(), expected.as_slice());
    }
}
