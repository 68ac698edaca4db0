//! Integration tests for a full browser session
//!
//! A scripted gateway answers every command through the same event channel the real
//! gateway uses, so these tests exercise the event loop plumbing (`apply_action`,
//! `pump_events`) together with the core state.

use mqtt_browser::gateway::{Gateway, GatewayCommand, GatewayEvent};
use mqtt_browser::messages::Message;
use mqtt_browser::topics::SubscriptionPreset;
use mqtt_browser::tui::{apply_action, pump_events, Action, BrowserConfig, BrowserState, Focus};
use std::collections::BTreeSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Gateway that answers commands immediately, like a cooperative broker.
struct ScriptedGateway {
    events: UnboundedSender<GatewayEvent>,
    catalog: Vec<String>,
    /// Topics whose subscribe requests are rejected.
    rejecting: BTreeSet<String>,
    commands: Vec<GatewayCommand>,
}

impl ScriptedGateway {
    fn new(catalog: &[&str]) -> (Self, UnboundedReceiver<GatewayEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                events,
                catalog: catalog.iter().map(|t| t.to_string()).collect(),
                rejecting: BTreeSet::new(),
                commands: Vec::new(),
            },
            receiver,
        )
    }

    fn publish(&self, topic: &str, payload: &str) {
        self.events
            .send(GatewayEvent::MessageReceived(Message::new(topic, payload)))
            .unwrap();
    }

    fn subscribes(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                GatewayCommand::Subscribe(topic) => Some(topic.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Gateway for ScriptedGateway {
    fn connect(&mut self) {
        self.events.send(GatewayEvent::Connected).unwrap();
    }

    fn discover_topics(&mut self) {
        self.commands.push(GatewayCommand::DiscoverTopics);
        self.events
            .send(GatewayEvent::TopicsDiscovered(self.catalog.clone()))
            .unwrap();
    }

    fn subscribe(&mut self, topic: &str) {
        self.commands
            .push(GatewayCommand::Subscribe(topic.to_string()));
        let event = if self.rejecting.contains(topic) {
            GatewayEvent::SubscribeFailed {
                topic: topic.to_string(),
                reason: "not authorized".to_string(),
            }
        } else {
            GatewayEvent::Subscribed(topic.to_string())
        };
        self.events.send(event).unwrap();
    }

    fn unsubscribe(&mut self, topic: &str) {
        self.commands
            .push(GatewayCommand::Unsubscribe(topic.to_string()));
        self.events
            .send(GatewayEvent::Unsubscribed(topic.to_string()))
            .unwrap();
    }

    fn disconnect(&mut self) {
        self.commands.push(GatewayCommand::Disconnect);
    }
}

/// Connect and pump until the scripted gateway has nothing more to say.
fn start(
    state: &mut BrowserState,
    gateway: &mut ScriptedGateway,
    events: &mut UnboundedReceiver<GatewayEvent>,
) {
    gateway.connect();
    settle(state, gateway, events);
}

fn settle(
    state: &mut BrowserState,
    gateway: &mut ScriptedGateway,
    events: &mut UnboundedReceiver<GatewayEvent>,
) {
    while pump_events(state, gateway, events).unwrap() > 0 {}
}

fn browser() -> BrowserState {
    let mut state = BrowserState::new(BrowserConfig::default());
    state.set_viewport(10, 5);
    state
}

/// Discover two topics, subscribe to the second and watch its first message arrive.
#[test]
fn test_subscribe_and_receive() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["b/2", "a/1"]);
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    assert!(state.is_connected());
    assert_eq!(state.topics(), &["a/1", "b/2"]);
    assert!(gateway.subscribes().is_empty());

    apply_action(&mut state, &mut gateway, Action::MoveDown);
    apply_action(&mut state, &mut gateway, Action::ToggleSubscription);
    apply_action(&mut state, &mut gateway, Action::ToggleFocus);
    settle(&mut state, &mut gateway, &mut events);

    gateway.publish("b/2", "hello");
    settle(&mut state, &mut gateway, &mut events);

    assert_eq!(state.selection(), 1);
    assert_eq!(state.focus(), Focus::Messages);
    assert_eq!(gateway.subscribes(), vec!["b/2"]);
    assert!(state.subscriptions().is_desired("b/2"));
    assert!(!state.subscriptions().is_desired("a/1"));
    assert!(state.reconciler().is_applied("b/2"));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.message_count, 1);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].topic, "b/2");
    assert_eq!(snapshot.messages[0].payload, b"hello");
}

/// Unsubscribing goes through the gateway and updates the applied set.
#[test]
fn test_toggle_off_unsubscribes() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1"]);
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    apply_action(&mut state, &mut gateway, Action::ToggleSubscription);
    settle(&mut state, &mut gateway, &mut events);
    assert!(state.reconciler().is_applied("a/1"));

    apply_action(&mut state, &mut gateway, Action::ToggleSubscription);
    settle(&mut state, &mut gateway, &mut events);
    assert!(!state.reconciler().is_applied("a/1"));
    assert_eq!(
        gateway.commands.last(),
        Some(&GatewayCommand::Unsubscribe("a/1".to_string()))
    );
}

/// Ten messages, then reset: the stream and its cursor start over.
#[test]
fn test_reset_messages() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1"]);
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    for i in 0..10 {
        gateway.publish("a/1", &i.to_string());
    }
    settle(&mut state, &mut gateway, &mut events);
    assert_eq!(state.messages().len(), 10);
    assert_eq!(state.message_scroll(), 5);

    apply_action(&mut state, &mut gateway, Action::ResetMessages);
    assert_eq!(state.messages().len(), 0);
    assert_eq!(state.message_scroll(), 0);
}

/// A rejected subscription is reported, kept as intent and retried on the next pass.
#[test]
fn test_rejected_subscription_is_retried() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1", "secret"]);
    gateway.rejecting.insert("secret".to_string());
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    apply_action(&mut state, &mut gateway, Action::MoveDown);
    apply_action(&mut state, &mut gateway, Action::ToggleSubscription);
    settle(&mut state, &mut gateway, &mut events);

    assert!(state.subscriptions().is_desired("secret"));
    assert!(!state.reconciler().is_applied("secret"));
    assert_eq!(
        state.last_error(),
        Some("MQTT Error: failed to subscribe to secret: not authorized")
    );
    assert_eq!(gateway.subscribes(), vec!["secret"]);

    // The broker changes its mind; any later event triggers the retry.
    gateway.rejecting.clear();
    gateway.publish("a/1", "tick");
    settle(&mut state, &mut gateway, &mut events);

    assert_eq!(gateway.subscribes(), vec!["secret", "secret"]);
    assert!(state.reconciler().is_applied("secret"));
    assert!(state.last_error().is_none());
}

/// A reconnect replays discovery and every desired subscription.
#[test]
fn test_reconnect_restores_subscriptions() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1", "b/2"]);
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    apply_action(&mut state, &mut gateway, Action::ToggleSubscription);
    settle(&mut state, &mut gateway, &mut events);

    gateway
        .events
        .send(GatewayEvent::ConnectionLost("broker restarted".to_string()))
        .unwrap();
    settle(&mut state, &mut gateway, &mut events);
    assert!(!state.is_connected());
    assert!(state.last_error().is_some());

    gateway.connect();
    settle(&mut state, &mut gateway, &mut events);

    assert!(state.is_connected());
    assert!(state.last_error().is_none());
    assert_eq!(gateway.subscribes(), vec!["a/1", "a/1"]);
    let discoveries = gateway
        .commands
        .iter()
        .filter(|c| **c == GatewayCommand::DiscoverTopics)
        .count();
    assert_eq!(discoveries, 2);
}

/// Startup presets are subscribed as soon as the session is up.
#[test]
fn test_preset_subscribed_on_connect() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1"]);
    let mut state = BrowserState::new(BrowserConfig {
        preset: SubscriptionPreset::from_topics(["sensors/#"]),
        ..BrowserConfig::default()
    });
    start(&mut state, &mut gateway, &mut events);

    assert_eq!(gateway.subscribes(), vec!["sensors/#"]);
    assert_eq!(state.topics(), &["a/1", "sensors/#"]);
}

/// Quit disconnects once and ignores whatever the gateway still delivers.
#[test]
fn test_quit_ignores_late_events() {
    let (mut gateway, mut events) = ScriptedGateway::new(&["a/1"]);
    let mut state = browser();
    start(&mut state, &mut gateway, &mut events);

    apply_action(&mut state, &mut gateway, Action::Quit);
    gateway.publish("a/1", "late");
    settle(&mut state, &mut gateway, &mut events);

    assert!(state.is_quit_requested());
    assert_eq!(gateway.commands.last(), Some(&GatewayCommand::Disconnect));
    assert!(state.messages().is_empty());
}
