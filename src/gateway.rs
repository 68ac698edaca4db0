//! Broker gateway capability
//!
//! The browser core talks to the broker only through the [`Gateway`] trait. Every method
//! is a fire-and-forget request: it returns immediately and its outcome arrives later as a
//! [`GatewayEvent`] on the gateway's event channel. Deliveries and connection changes are
//! posted on the same channel, so the core sees one ordered stream of events.

use crate::messages::Message;
use crate::subscriptions::SubscriptionAction;

/// An event posted by the gateway's background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The broker accepted the connection (initial connect or reconnect).
    Connected,
    /// Connecting failed before the session was established.
    ConnectFailed(String),
    /// An established connection dropped.
    ConnectionLost(String),
    /// Topics collected by discovery so far.
    TopicsDiscovered(Vec<String>),
    /// The discovery subscription could not be issued.
    DiscoveryFailed(String),
    /// A message arrived on a subscribed topic.
    MessageReceived(Message),
    Subscribed(String),
    SubscribeFailed { topic: String, reason: String },
    Unsubscribed(String),
    UnsubscribeFailed { topic: String, reason: String },
}

/// A request the core wants the gateway to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    DiscoverTopics,
    Subscribe(String),
    Unsubscribe(String),
    Disconnect,
}

impl From<SubscriptionAction> for GatewayCommand {
    fn from(action: SubscriptionAction) -> Self {
        match action {
            SubscriptionAction::Subscribe(topic) => GatewayCommand::Subscribe(topic),
            SubscriptionAction::Unsubscribe(topic) => GatewayCommand::Unsubscribe(topic),
        }
    }
}

/// Asynchronous broker capability used by the browser core.
pub trait Gateway {
    /// Start connecting. Posts `Connected` or `ConnectFailed`.
    fn connect(&mut self);

    /// Start wildcard discovery. Posts `TopicsDiscovered` once the collection window has
    /// elapsed, and again whenever new topics show up.
    fn discover_topics(&mut self);

    /// Posts `Subscribed` or `SubscribeFailed`.
    fn subscribe(&mut self, topic: &str);

    /// Posts `Unsubscribed` or `UnsubscribeFailed`.
    fn unsubscribe(&mut self, topic: &str);

    /// Close the session. No further events are expected to matter.
    fn disconnect(&mut self);

    /// Carry out a command produced by the core.
    fn dispatch(&mut self, command: GatewayCommand) {
        match command {
            GatewayCommand::DiscoverTopics => self.discover_topics(),
            GatewayCommand::Subscribe(topic) => self.subscribe(&topic),
            GatewayCommand::Unsubscribe(topic) => self.unsubscribe(&topic),
            GatewayCommand::Disconnect => self.disconnect(),
        }
    }
}
