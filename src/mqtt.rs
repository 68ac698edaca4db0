//! MQTT gateway module
//!
//! Implements the [`Gateway`] capability on top of `rumqttc`.
//!
//! The rumqttc event loop runs on a background tokio task. It records every topic it sees
//! in a shared [`DiscoveredTopics`] accumulator, forwards publishes for actively subscribed
//! topics as [`GatewayEvent::MessageReceived`], and reports connection changes. Subscribe,
//! unsubscribe and discovery requests are queued on the client right away; their outcome
//! is posted once the broker answers with SUBACK or UNSUBACK.

use crate::error::MqttBrowserError;
use crate::gateway::{Gateway, GatewayEvent};
use crate::messages::Message;
use crate::util::{generate_client_id, DISCONNECT_TIMEOUT_SECS, RECONNECT_DELAY};
use rumqttc::mqttbytes::matches;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubscribeReasonCode,
    Transport,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Topic filter used for discovery.
pub const DISCOVERY_FILTER: &str = "#";

/// Default broker address when none is configured.
pub const DEFAULT_BROKER_URL: &str = "tcp://localhost:1883";

/// Default time discovery collects topics before posting its first summary.
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(2);

/// Capacity of the rumqttc request channel.
const REQUEST_CAPACITY: usize = 64;

/// Parsed broker URL such as `tcp://localhost:1883` or `ssl://broker:8883`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerAddress {
    /// Parse a broker URL. A blank value yields [`DEFAULT_BROKER_URL`].
    ///
    /// Accepted schemes are `tcp` and `mqtt` (plain, default port 1883) and `ssl`, `tls`
    /// and `mqtts` (TLS, default port 8883). A missing scheme means `tcp`.
    pub fn parse(url: &str) -> Result<Self, MqttBrowserError> {
        let url = url.trim();
        let url = if url.is_empty() { DEFAULT_BROKER_URL } else { url };

        let (scheme, rest) = url.split_once("://").unwrap_or(("tcp", url));
        let tls = match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" => true,
            other => {
                return Err(MqttBrowserError::InvalidArgument(format!(
                    "unsupported broker scheme '{}' in {}",
                    other, url
                )))
            }
        };
        let default_port = if tls { 8883 } else { 1883 };

        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    MqttBrowserError::InvalidArgument(format!(
                        "invalid broker port '{}' in {}",
                        port, url
                    ))
                })?;
                (host, port)
            }
            None => (authority, default_port),
        };
        if host.is_empty() {
            return Err(MqttBrowserError::InvalidArgument(format!(
                "missing broker host in {}",
                url
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "ssl" } else { "tcp" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

/// TLS settings for secure broker connections.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// CA certificate used to verify the broker. Without one the platform defaults apply.
    pub ca_cert: Option<PathBuf>,
}

impl TlsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.ca_cert = Some(path);
        self
    }

    fn transport(&self) -> Result<Transport, MqttBrowserError> {
        let ca_bytes = match &self.ca_cert {
            Some(ca_path) => fs::read(ca_path).map_err(|e| {
                MqttBrowserError::Tls(format!(
                    "Failed to read CA certificate from {:?}: {}",
                    ca_path, e
                ))
            })?,
            None => Vec::new(),
        };

        if ca_bytes.is_empty() {
            Ok(Transport::tls_with_default_config())
        } else {
            Ok(Transport::tls(ca_bytes, None, None))
        }
    }
}

/// Everything needed to open a gateway session.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub address: BrokerAddress,
    /// Client identifier; blank means "generate one".
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<TlsConfig>,
    /// QoS used for per-topic subscriptions.
    pub qos: QoS,
    pub keep_alive: Duration,
    pub discovery_window: Duration,
}

impl GatewayConfig {
    pub fn new(address: BrokerAddress, client_id: String) -> Self {
        Self {
            address,
            client_id,
            username: None,
            password: None,
            tls: None,
            qos: QoS::AtMostOnce,
            keep_alive: Duration::from_secs(30),
            discovery_window: DEFAULT_DISCOVERY_WINDOW,
        }
    }

    /// Set credentials. A blank username disables authentication.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        if !username.is_empty() {
            self.username = Some(username);
            self.password = Some(password);
        }
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_discovery_window(mut self, window: Duration) -> Self {
        self.discovery_window = window;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }

    /// Build the rumqttc options for this configuration.
    pub fn mqtt_options(&self) -> Result<MqttOptions, MqttBrowserError> {
        let client_id = generate_client_id(&Some(self.client_id.clone()));
        let mut options = MqttOptions::new(client_id, &self.address.host, self.address.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }

        match (&self.tls, self.address.tls) {
            (Some(_), false) => {
                return Err(MqttBrowserError::Tls(format!(
                    "TLS settings given for plain broker {}",
                    self.address
                )))
            }
            (tls, true) => {
                let tls = tls.clone().unwrap_or_default();
                options.set_transport(tls.transport()?);
            }
            (None, false) => {}
        }

        Ok(options)
    }
}

#[derive(Debug, Default)]
struct Discovered {
    topics: BTreeSet<String>,
    generation: u64,
}

/// Topics seen by the gateway's delivery task.
///
/// Written under the write lock by the event loop task, read under the read lock by the
/// discovery task. Callers only ever receive copies.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredTopics {
    inner: Arc<RwLock<Discovered>>,
}

impl DiscoveredTopics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a topic. Returns true when it was not seen before.
    pub fn record(&self, topic: &str) -> bool {
        if let Ok(guard) = self.inner.read() {
            if guard.topics.contains(topic) {
                return false;
            }
        }
        match self.inner.write() {
            Ok(mut guard) => {
                let inserted = guard.topics.insert(topic.to_string());
                if inserted {
                    guard.generation += 1;
                }
                inserted
            }
            Err(_) => false,
        }
    }

    /// Sorted copy of every topic recorded so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner
            .read()
            .map(|guard| guard.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Counter bumped on every new topic.
    pub fn generation(&self) -> u64 {
        self.inner.read().map(|guard| guard.generation).unwrap_or(0)
    }
}

/// Topics whose publishes are forwarded as messages.
#[derive(Debug, Clone, Default)]
struct ActiveTopics(Arc<RwLock<HashSet<String>>>);

impl ActiveTopics {
    fn insert(&self, topic: &str) {
        if let Ok(mut guard) = self.0.write() {
            guard.insert(topic.to_string());
        }
    }

    fn remove(&self, topic: &str) {
        if let Ok(mut guard) = self.0.write() {
            guard.remove(topic);
        }
    }

    /// Whether any active filter matches `topic`. Filters may carry `+` and `#`.
    fn matches(&self, topic: &str) -> bool {
        self.0
            .read()
            .map(|guard| guard.iter().any(|filter| matches(topic, filter)))
            .unwrap_or(false)
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.0.write() {
            guard.clear();
        }
    }
}

/// A subscription request handed to rumqttc and not yet acknowledged by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Request {
    Discover,
    Subscribe(String),
    Unsubscribe(String),
}

#[derive(Debug, Default)]
struct Requests {
    /// Queued on the client, waiting for the event loop to assign a packet id.
    queued: VecDeque<(u64, Request)>,
    /// Written to the broker, keyed by packet id.
    awaiting: HashMap<u16, Request>,
    next_id: u64,
}

/// Correlates SUBSCRIBE/UNSUBSCRIBE packets with the requests that produced them.
///
/// rumqttc sends requests in the order they were queued and reports each packet id as it
/// goes out, so the oldest queued request owns the next outgoing packet id.
#[derive(Debug, Clone, Default)]
struct PendingRequests(Arc<Mutex<Requests>>);

impl PendingRequests {
    fn enqueue(&self, request: Request) -> u64 {
        match self.0.lock() {
            Ok(mut guard) => {
                let id = guard.next_id;
                guard.next_id += 1;
                guard.queued.push_back((id, request));
                id
            }
            Err(_) => 0,
        }
    }

    /// Forget a request the client refused to queue.
    fn cancel(&self, id: u64) {
        if let Ok(mut guard) = self.0.lock() {
            guard.queued.retain(|(queued, _)| *queued != id);
        }
    }

    fn sent(&self, pkid: u16) {
        if let Ok(mut guard) = self.0.lock() {
            match guard.queued.pop_front() {
                Some((_, request)) => {
                    guard.awaiting.insert(pkid, request);
                }
                None => debug!(pkid, "Outgoing request without a queued entry"),
            }
        }
    }

    fn acknowledged(&self, pkid: u16) -> Option<Request> {
        self.0
            .lock()
            .ok()
            .and_then(|mut guard| guard.awaiting.remove(&pkid))
    }

    /// Drop everything. The session is clean, so the core re-issues what it still wants.
    fn clear(&self) {
        if let Ok(mut guard) = self.0.lock() {
            guard.queued.clear();
            guard.awaiting.clear();
        }
    }
}

/// State shared between the gateway handle and its event loop task.
#[derive(Debug, Clone, Default)]
struct Session {
    discovered: DiscoveredTopics,
    active: ActiveTopics,
    requests: PendingRequests,
}

/// Turns rumqttc event loop output into gateway events.
#[derive(Debug)]
struct SessionTracker {
    session: Session,
    connected: bool,
}

impl SessionTracker {
    fn new(session: Session) -> Self {
        Self {
            session,
            connected: false,
        }
    }

    fn on_event(&mut self, event: Event) -> Option<GatewayEvent> {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                self.connected = true;
                self.session.active.clear();
                info!("Connected to MQTT broker");
                Some(GatewayEvent::Connected)
            }
            Event::Incoming(Packet::Publish(publish)) => {
                if self.session.discovered.record(&publish.topic) {
                    debug!(topic = %publish.topic, "Discovered topic");
                }
                self.session.active.matches(&publish.topic).then(|| {
                    GatewayEvent::MessageReceived(Message::new(
                        publish.topic,
                        publish.payload.to_vec(),
                    ))
                })
            }
            Event::Outgoing(Outgoing::Subscribe(pkid))
            | Event::Outgoing(Outgoing::Unsubscribe(pkid)) => {
                self.session.requests.sent(pkid);
                None
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                let accepted = ack
                    .return_codes
                    .iter()
                    .all(|code| matches!(code, SubscribeReasonCode::Success(_)));
                self.on_suback(ack.pkid, accepted)
            }
            Event::Incoming(Packet::UnsubAck(ack)) => {
                match self.session.requests.acknowledged(ack.pkid) {
                    Some(Request::Unsubscribe(topic)) => {
                        self.session.active.remove(&topic);
                        info!(%topic, "Unsubscribed");
                        Some(GatewayEvent::Unsubscribed(topic))
                    }
                    other => {
                        debug!(pkid = ack.pkid, request = ?other, "Unexpected UNSUBACK");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn on_suback(&mut self, pkid: u16, accepted: bool) -> Option<GatewayEvent> {
        match self.session.requests.acknowledged(pkid) {
            Some(Request::Discover) if accepted => {
                info!("Discovery subscription active");
                None
            }
            Some(Request::Discover) => {
                warn!("Broker refused the discovery subscription");
                Some(GatewayEvent::DiscoveryFailed(format!(
                    "broker refused subscription to {}",
                    DISCOVERY_FILTER
                )))
            }
            Some(Request::Subscribe(topic)) if accepted => {
                self.session.active.insert(&topic);
                info!(%topic, "Subscribed");
                Some(GatewayEvent::Subscribed(topic))
            }
            Some(Request::Subscribe(topic)) => {
                warn!(%topic, "Broker refused the subscription");
                Some(GatewayEvent::SubscribeFailed {
                    topic,
                    reason: "broker refused the subscription".to_string(),
                })
            }
            other => {
                debug!(pkid, request = ?other, "Unexpected SUBACK");
                None
            }
        }
    }

    fn on_error(&mut self, reason: String) -> GatewayEvent {
        self.session.requests.clear();
        let event = if self.connected {
            warn!(error = %reason, "Connection lost");
            GatewayEvent::ConnectionLost(reason)
        } else {
            warn!(error = %reason, "Connection failed");
            GatewayEvent::ConnectFailed(reason)
        };
        self.connected = false;
        event
    }
}

/// rumqttc-backed broker gateway.
pub struct MqttGateway {
    client: AsyncClient,
    eventloop: Option<EventLoop>,
    events: mpsc::UnboundedSender<GatewayEvent>,
    session: Session,
    qos: QoS,
    discovery_window: Duration,
    poll_task: Option<JoinHandle<()>>,
    discovery_task: Option<JoinHandle<()>>,
}

impl MqttGateway {
    /// Create a gateway and the receiver of its events. Nothing touches the network until
    /// [`Gateway::connect`] is called.
    pub fn new(
        config: GatewayConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<GatewayEvent>), MqttBrowserError> {
        let options = config.mqtt_options()?;
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (events, receiver) = mpsc::unbounded_channel();

        Ok((
            Self {
                client,
                eventloop: Some(eventloop),
                events,
                session: Session::default(),
                qos: config.qos,
                discovery_window: config.discovery_window,
                poll_task: None,
                discovery_task: None,
            },
            receiver,
        ))
    }

    /// Accumulator of every topic the event loop has seen.
    pub fn discovered(&self) -> &DiscoveredTopics {
        &self.session.discovered
    }

    /// Wait for the event loop to flush the disconnect, then stop all background tasks.
    pub async fn close(mut self) {
        if let Some(task) = self.discovery_task.take() {
            task.abort();
        }
        if let Some(mut task) = self.poll_task.take() {
            let timeout = Duration::from_secs(DISCONNECT_TIMEOUT_SECS);
            if tokio::time::timeout(timeout, &mut task).await.is_err() {
                warn!("Timed out waiting for MQTT disconnect");
                task.abort();
            }
        }
    }

    /// Queue a SUBSCRIBE and track it until its SUBACK. Returns the queueing error, if any.
    fn queue_subscribe(&self, filter: &str, qos: QoS, request: Request) -> Result<(), String> {
        let id = self.session.requests.enqueue(request);
        self.client.try_subscribe(filter, qos).map_err(|e| {
            self.session.requests.cancel(id);
            e.to_string()
        })
    }
}

impl Gateway for MqttGateway {
    fn connect(&mut self) {
        let Some(eventloop) = self.eventloop.take() else {
            warn!("Gateway already connected");
            return;
        };
        info!("Connecting to MQTT broker");
        self.poll_task = Some(tokio::spawn(poll_events(
            eventloop,
            self.events.clone(),
            SessionTracker::new(self.session.clone()),
        )));
    }

    fn discover_topics(&mut self) {
        if let Some(task) = self.discovery_task.take() {
            task.abort();
        }
        if let Err(reason) =
            self.queue_subscribe(DISCOVERY_FILTER, QoS::AtMostOnce, Request::Discover)
        {
            warn!(error = %reason, "Discovery subscription not queued");
            let _ = self.events.send(GatewayEvent::DiscoveryFailed(reason));
            return;
        }

        let events = self.events.clone();
        let discovered = self.session.discovered.clone();
        let window = self.discovery_window;
        self.discovery_task = Some(tokio::spawn(async move {
            let mut reported = None;
            loop {
                tokio::time::sleep(window).await;
                let generation = discovered.generation();
                if reported == Some(generation) {
                    continue;
                }
                reported = Some(generation);
                let topics = discovered.snapshot();
                info!(count = topics.len(), "Topic discovery summary");
                if events.send(GatewayEvent::TopicsDiscovered(topics)).is_err() {
                    break;
                }
            }
        }));
    }

    fn subscribe(&mut self, topic: &str) {
        if let Err(reason) =
            self.queue_subscribe(topic, self.qos, Request::Subscribe(topic.to_string()))
        {
            warn!(%topic, error = %reason, "Subscribe not queued");
            let _ = self.events.send(GatewayEvent::SubscribeFailed {
                topic: topic.to_string(),
                reason,
            });
        }
    }

    fn unsubscribe(&mut self, topic: &str) {
        let id = self
            .session
            .requests
            .enqueue(Request::Unsubscribe(topic.to_string()));
        if let Err(e) = self.client.try_unsubscribe(topic) {
            self.session.requests.cancel(id);
            warn!(%topic, error = %e, "Unsubscribe not queued");
            let _ = self.events.send(GatewayEvent::UnsubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }
    }

    fn disconnect(&mut self) {
        if let Some(task) = self.discovery_task.take() {
            task.abort();
        }
        info!("Disconnecting from MQTT broker");
        if let Err(e) = self.client.try_disconnect() {
            debug!(error = %e, "Disconnect request not queued");
        }
    }
}

/// Drive the rumqttc event loop until the disconnect is flushed or nobody listens anymore.
async fn poll_events(
    mut eventloop: EventLoop,
    events: mpsc::UnboundedSender<GatewayEvent>,
    mut tracker: SessionTracker,
) {
    loop {
        let sent = match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("Disconnect sent");
                break;
            }
            Ok(event) => match tracker.on_event(event) {
                Some(event) => events.send(event),
                None => Ok(()),
            },
            Err(e) => {
                let sent = events.send(tracker.on_error(e.to_string()));
                tokio::time::sleep(RECONNECT_DELAY).await;
                sent
            }
        };
        if sent.is_err() {
            debug!("Event receiver dropped; stopping MQTT event loop");
            break;
        }
    }
}
