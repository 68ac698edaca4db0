//! Browser state management
//!
//! [`BrowserState`] is the single owner of everything the browser knows: the topic
//! catalog, the desired and applied subscriptions, the message stream, both pane cursors
//! and the focus. It is mutated only by the event loop, one key press or gateway event at
//! a time, and answers each with the gateway commands that event calls for.

use crate::error::BrowserFault;
use crate::gateway::{GatewayCommand, GatewayEvent};
use crate::messages::{Message, MessageBuffer, DEFAULT_FOLLOW_MARGIN};
use crate::subscriptions::{Reconciler, SubscriptionAction, SubscriptionSet};
use crate::topics::{SubscriptionPreset, TopicRegistry};
use crate::tui::types::{Action, Focus};
use crate::tui::viewport::PaneViewport;
use tracing::{debug, info};

/// Startup settings for [`BrowserState`].
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Broker shown in the status line.
    pub broker_label: String,
    /// Positions behind the tail that still count as following the message stream.
    pub follow_margin: usize,
    /// Topics subscribed from the start.
    pub preset: SubscriptionPreset,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            broker_label: String::new(),
            follow_margin: DEFAULT_FOLLOW_MARGIN,
            preset: SubscriptionPreset::default(),
        }
    }
}

/// One row of the topics pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicRow<'a> {
    pub name: &'a str,
    /// The user wants this topic subscribed.
    pub subscribed: bool,
    /// The gateway confirmed the subscription.
    pub active: bool,
}

/// Read-only view of the state handed to the renderer.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    pub broker: &'a str,
    pub connected: bool,
    pub topics: Vec<TopicRow<'a>>,
    pub selection: usize,
    pub topic_scroll: usize,
    /// Messages inside the current viewport.
    pub messages: &'a [Message],
    pub message_scroll: usize,
    pub message_count: usize,
    pub focus: Focus,
    pub last_error: Option<&'a str>,
}

/// State of the browser session.
#[derive(Debug, Clone)]
pub struct BrowserState {
    broker_label: String,
    registry: TopicRegistry,
    topics: Vec<String>,
    subscriptions: SubscriptionSet,
    reconciler: Reconciler,
    messages: MessageBuffer,
    topic_view: PaneViewport,
    focus: Focus,
    connected: bool,
    last_error: Option<String>,
    quit_requested: bool,
}

impl Default for BrowserState {
    fn default() -> Self {
        Self::new(BrowserConfig::default())
    }
}

impl BrowserState {
    pub fn new(config: BrowserConfig) -> Self {
        let mut state = Self {
            broker_label: config.broker_label,
            registry: TopicRegistry::new(),
            topics: Vec::new(),
            subscriptions: SubscriptionSet::new(),
            reconciler: Reconciler::new(),
            messages: MessageBuffer::new(config.follow_margin),
            topic_view: PaneViewport::default(),
            focus: Focus::Topics,
            connected: false,
            last_error: None,
            quit_requested: false,
        };
        for topic in config.preset.topics() {
            state.subscriptions.set(topic, true);
        }
        state.set_topics(config.preset.topics());
        state
    }

    // === Accessors ===

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// The topic catalog in display order.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn selection(&self) -> usize {
        self.topic_view.selection()
    }

    /// The highlighted topic, if the catalog is not empty.
    pub fn selected_topic(&self) -> Option<&str> {
        self.topics.get(self.selection()).map(String::as_str)
    }

    pub fn topic_scroll(&self) -> usize {
        self.topic_view.scroll()
    }

    pub fn topic_view(&self) -> &PaneViewport {
        &self.topic_view
    }

    pub fn messages(&self) -> &MessageBuffer {
        &self.messages
    }

    pub fn message_scroll(&self) -> usize {
        self.messages.scroll()
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }

    // === Mutations ===

    /// Tell the state how many rows each pane shows.
    pub fn set_viewport(&mut self, topic_rows: usize, message_rows: usize) {
        self.topic_view.set_capacity(topic_rows);
        self.messages.set_capacity(message_rows);
    }

    /// Merge topics into the catalog. When the catalog changed, the topics pane
    /// re-clamps its selection and scrolls back to the top.
    pub fn set_topics<I, S>(&mut self, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.registry.observe_all(topics) {
            self.refresh_topics();
        }
    }

    fn refresh_topics(&mut self) {
        self.topics = self.registry.snapshot();
        self.topic_view.set_len(self.topics.len());
    }

    fn set_fault(&mut self, fault: BrowserFault) {
        self.last_error = Some(fault.to_string());
    }

    /// Apply a user action and return the commands it requires.
    pub fn handle_action(&mut self, action: Action) -> Vec<GatewayCommand> {
        if self.quit_requested {
            return Vec::new();
        }
        match action {
            Action::ToggleFocus => {
                self.focus = self.focus.toggled();
                debug!(focus = %self.focus, "Focus changed");
            }
            Action::MoveUp => self.move_by(-1),
            Action::MoveDown => self.move_by(1),
            Action::ToggleSubscription => {
                if self.focus == Focus::Topics {
                    if let Some(topic) = self.selected_topic().map(str::to_string) {
                        let wanted = self.subscriptions.toggle(&topic);
                        info!(%topic, wanted, "Subscription toggled");
                    }
                }
            }
            Action::ResetMessages => {
                debug!(dropped = self.messages.len(), "Messages reset");
                self.messages.reset();
            }
            Action::Quit => {
                self.quit_requested = true;
                return vec![GatewayCommand::Disconnect];
            }
        }
        self.reconcile()
    }

    fn move_by(&mut self, delta: isize) {
        match self.focus {
            Focus::Topics => self.topic_view.move_by(delta),
            Focus::Messages => self.messages.scroll_by(delta),
        }
    }

    /// Apply a gateway event and return the commands it requires.
    ///
    /// Failed actions are not retried from inside their own failure event; the next
    /// reconciliation pass picks them up again.
    pub fn handle_event(&mut self, event: GatewayEvent) -> Vec<GatewayCommand> {
        if self.quit_requested {
            return Vec::new();
        }
        let mut commands = Vec::new();
        match event {
            GatewayEvent::Connected => {
                self.connected = true;
                self.last_error = None;
                self.reconciler.reset();
                commands.push(GatewayCommand::DiscoverTopics);
            }
            GatewayEvent::ConnectFailed(reason) => {
                self.connected = false;
                self.set_fault(BrowserFault::Connection(reason));
                return commands;
            }
            GatewayEvent::ConnectionLost(reason) => {
                self.connected = false;
                self.reconciler.reset();
                self.set_fault(BrowserFault::ConnectionLost(reason));
                return commands;
            }
            GatewayEvent::TopicsDiscovered(topics) => self.set_topics(topics),
            GatewayEvent::DiscoveryFailed(reason) => {
                self.set_fault(BrowserFault::Discovery(reason));
            }
            GatewayEvent::MessageReceived(message) => {
                if self.registry.observe(&message.topic) {
                    self.refresh_topics();
                }
                self.messages
                    .append(message, self.focus == Focus::Messages);
            }
            GatewayEvent::Subscribed(topic) => {
                self.reconciler
                    .confirm(&SubscriptionAction::Subscribe(topic));
                self.last_error = None;
            }
            GatewayEvent::Unsubscribed(topic) => {
                self.reconciler
                    .confirm(&SubscriptionAction::Unsubscribe(topic));
                self.last_error = None;
            }
            GatewayEvent::SubscribeFailed { topic, reason } => {
                self.reconciler
                    .fail(&SubscriptionAction::Subscribe(topic.clone()));
                self.set_fault(BrowserFault::Subscribe { topic, reason });
                return commands;
            }
            GatewayEvent::UnsubscribeFailed { topic, reason } => {
                self.reconciler
                    .fail(&SubscriptionAction::Unsubscribe(topic.clone()));
                self.set_fault(BrowserFault::Unsubscribe { topic, reason });
                return commands;
            }
        }
        commands.extend(self.reconcile());
        commands
    }

    /// Diff desired against applied subscriptions. Does nothing while disconnected.
    pub fn reconcile(&mut self) -> Vec<GatewayCommand> {
        if !self.connected {
            return Vec::new();
        }
        self.reconciler
            .reconcile(&self.subscriptions)
            .into_iter()
            .map(GatewayCommand::from)
            .collect()
    }

    /// Read-only view for rendering.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            broker: &self.broker_label,
            connected: self.connected,
            topics: self
                .topics
                .iter()
                .map(|topic| TopicRow {
                    name: topic,
                    subscribed: self.subscriptions.is_desired(topic),
                    active: self.reconciler.is_applied(topic),
                })
                .collect(),
            selection: self.topic_view.selection(),
            topic_scroll: self.topic_view.scroll(),
            messages: self.messages.visible(),
            message_scroll: self.messages.scroll(),
            message_count: self.messages.len(),
            focus: self.focus,
            last_error: self.last_error.as_deref(),
        }
    }
}
