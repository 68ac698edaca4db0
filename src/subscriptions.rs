//! Subscription reconciliation
//!
//! The user's intent is a [`SubscriptionSet`]: a flag per topic, flipped by the toggle
//! key. The [`Reconciler`] remembers which topics the gateway has confirmed (`applied`)
//! and which requests are still travelling (`in_flight`), and turns the difference
//! between intent and reality into the minimal list of [`SubscriptionAction`]s.
//!
//! Actions are independent. A failed subscribe leaves `applied` untouched, so the next
//! pass sees the topic as still missing and issues it again.

use std::collections::{BTreeMap, BTreeSet};

/// Desired subscription flag per topic.
///
/// Entries are never removed; toggling off only clears the flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    desired: BTreeMap<String, bool>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag of `topic`, returning the new value.
    pub fn toggle(&mut self, topic: &str) -> bool {
        let flag = self.desired.entry(topic.to_string()).or_insert(false);
        *flag = !*flag;
        *flag
    }

    /// Set the flag of `topic` explicitly.
    pub fn set(&mut self, topic: &str, desired: bool) {
        self.desired.insert(topic.to_string(), desired);
    }

    pub fn is_desired(&self, topic: &str) -> bool {
        self.desired.get(topic).copied().unwrap_or(false)
    }

    /// Topics whose flag is true, in sorted order.
    pub fn desired_topics(&self) -> impl Iterator<Item = &str> {
        self.desired
            .iter()
            .filter(|(_, wanted)| **wanted)
            .map(|(topic, _)| topic.as_str())
    }

    /// Every topic that ever had a flag, wanted or not.
    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> {
        self.desired.iter().map(|(topic, wanted)| (topic.as_str(), *wanted))
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            desired: iter.into_iter().map(|(t, f)| (t.into(), f)).collect(),
        }
    }
}

/// A single request to bring the gateway in line with the desired set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SubscriptionAction {
    Subscribe(String),
    Unsubscribe(String),
}

impl SubscriptionAction {
    pub fn topic(&self) -> &str {
        match self {
            SubscriptionAction::Subscribe(topic) | SubscriptionAction::Unsubscribe(topic) => topic,
        }
    }
}

/// Compute the actions that turn `applied` into the true entries of `desired`.
///
/// Subscriptions come first, each group in sorted topic order.
pub fn plan(desired: &SubscriptionSet, applied: &BTreeSet<String>) -> Vec<SubscriptionAction> {
    let wanted: BTreeSet<&str> = desired.desired_topics().collect();
    let subscribe = wanted
        .iter()
        .filter(|topic| !applied.contains(**topic))
        .map(|topic| SubscriptionAction::Subscribe(topic.to_string()));
    let unsubscribe = applied
        .iter()
        .filter(|topic| !wanted.contains(topic.as_str()))
        .map(|topic| SubscriptionAction::Unsubscribe(topic.clone()));
    subscribe.chain(unsubscribe).collect()
}

/// Tracks what the gateway has applied and what is still pending.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    applied: BTreeSet<String>,
    in_flight: BTreeMap<String, SubscriptionAction>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics the gateway has confirmed as subscribed.
    pub fn applied(&self) -> &BTreeSet<String> {
        &self.applied
    }

    pub fn is_applied(&self, topic: &str) -> bool {
        self.applied.contains(topic)
    }

    pub fn is_in_flight(&self, topic: &str) -> bool {
        self.in_flight.contains_key(topic)
    }

    /// Diff `desired` against `applied`, skipping topics with a request outstanding,
    /// and mark the returned actions as in flight.
    pub fn reconcile(&mut self, desired: &SubscriptionSet) -> Vec<SubscriptionAction> {
        let actions: Vec<_> = plan(desired, &self.applied)
            .into_iter()
            .filter(|action| !self.in_flight.contains_key(action.topic()))
            .collect();
        for action in &actions {
            self.in_flight
                .insert(action.topic().to_string(), action.clone());
        }
        actions
    }

    /// Record a successful action outcome.
    pub fn confirm(&mut self, action: &SubscriptionAction) {
        self.in_flight.remove(action.topic());
        match action {
            SubscriptionAction::Subscribe(topic) => {
                self.applied.insert(topic.clone());
            }
            SubscriptionAction::Unsubscribe(topic) => {
                self.applied.remove(topic);
            }
        }
    }

    /// Record a failed action outcome. `applied` is left as it was.
    pub fn fail(&mut self, action: &SubscriptionAction) {
        self.in_flight.remove(action.topic());
    }

    /// Forget everything the gateway had applied, e.g. after a (re)connection with a
    /// clean session.
    pub fn reset(&mut self) {
        self.applied.clear();
        self.in_flight.clear();
    }
}
