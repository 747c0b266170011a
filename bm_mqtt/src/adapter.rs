//! Connection lifecycle, subscription upkeep and change-suppressed publishing.
//!
//! The adapter is driven by the control loop. Each iteration calls
//! [`MqttAdapter::poll`] once (lifecycle step plus inbound drain) and
//! [`MqttAdapter::flush`] once with whatever the components queued.

use bm_common::consts::{
    DISCOVERY_FORCE_WINDOW_S, MQTT_CONNECT_TIMEOUT_S, PAYLOAD_OFFLINE, PAYLOAD_ONLINE,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connection::{Backoff, ConnectionState};
use crate::error::MqttError;
use crate::history::TopicHistory;
use crate::message::{InboundMessage, OutboundMessage};
use crate::topics::Topics;
use crate::transport::{ConnectOptions, MqttTransport, TransportEvent};

/// Result of one lifecycle step.
#[derive(Debug, Default)]
pub struct AdapterPoll {
    /// Messages received on subscribed topics.
    pub inbound: Vec<InboundMessage>,
    /// The session reached CONNECTED during this step.
    pub connected_now: bool,
    /// ... and it is the first session of this adapter.
    pub first_connect: bool,
}

/// MQTT adapter owning one transport.
pub struct MqttAdapter {
    transport: Box<dyn MqttTransport>,
    options: ConnectOptions,
    topics: Topics,
    state: ConnectionState,
    backoff: Backoff,
    history: TopicHistory,
    subscriptions: Vec<String>,
    force_until: Option<Duration>,
    connecting_since: Duration,
    sessions: u64,
}

impl MqttAdapter {
    /// Adapter in DISCONNECTED with an immediate first attempt.
    ///
    /// The last will of `options` is replaced by `offline` on the node's
    /// connectivity topic.
    pub fn new(transport: Box<dyn MqttTransport>, mut options: ConnectOptions, topics: Topics) -> Self {
        options.last_will = (topics.connectivity(), PAYLOAD_OFFLINE.to_string());
        Self {
            transport,
            options,
            topics,
            state: ConnectionState::Disconnected,
            backoff: Backoff::new(),
            history: TopicHistory::new(),
            subscriptions: Vec::new(),
            force_until: None,
            connecting_since: Duration::ZERO,
            sessions: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True in CONNECTED.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// True while a session is up or being set up, i.e. `poll` waits on the network.
    pub fn is_polling(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Node topics.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Successful sessions so far.
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Reconnect backoff.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Publication history.
    pub fn history(&self) -> &TopicHistory {
        &self.history
    }

    /// Options used for connection attempts.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Replace the subscription set. Applied now if connected, and on every
    /// fresh session.
    pub fn set_subscriptions(&mut self, topics: Vec<String>) -> Result<(), MqttError> {
        self.subscriptions = topics;
        if self.is_connected() {
            self.resubscribe()?;
        }
        Ok(())
    }

    /// Subscribed topics.
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    /// Open the post-discovery window in which every publish is forced.
    pub fn start_discovery_window(&mut self, now: Duration) {
        self.force_until = Some(now + Duration::from_secs(DISCOVERY_FORCE_WINDOW_S));
        debug!("discovery force window open until {:?}", self.force_until);
    }

    /// Whether `now` falls inside the post-discovery window.
    pub fn in_discovery_window(&self, now: Duration) -> bool {
        self.force_until.is_some_and(|until| now <= until)
    }

    /// Run one lifecycle step and drain inbound traffic.
    ///
    /// # Errors
    /// Only `MqttError::Fatal`; recoverable failures are absorbed into the
    /// state machine.
    pub fn poll(&mut self, now: Duration, timeout: Duration) -> Result<AdapterPoll, MqttError> {
        match self.state {
            ConnectionState::DisconnectPlanned => Ok(AdapterPoll::default()),
            ConnectionState::Disconnected => {
                if !self.backoff.ready(now) {
                    return Ok(AdapterPoll::default());
                }
                info!(
                    "MQTT connecting to {}:{} as {}",
                    self.options.host, self.options.port, self.options.client_id
                );
                match self.transport.connect(&self.options) {
                    Ok(()) => {
                        self.state = ConnectionState::Connecting;
                        self.connecting_since = now;
                        self.poll_transport(now, timeout)
                    }
                    Err(e) if e.is_recoverable() => {
                        self.attempt_failed(now, &e);
                        Ok(AdapterPoll::default())
                    }
                    Err(e) => Err(e),
                }
            }
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.poll_transport(now, timeout)
            }
        }
    }

    fn poll_transport(&mut self, now: Duration, timeout: Duration) -> Result<AdapterPoll, MqttError> {
        let mut out = AdapterPoll::default();
        let events = match self.transport.poll(timeout) {
            Ok(events) => events,
            Err(e) if e.is_recoverable() => {
                self.lost(now, &e);
                return Ok(out);
            }
            Err(e) => return Err(e),
        };
        for event in events {
            match event {
                TransportEvent::ConnAck if self.state == ConnectionState::Connecting => {
                    if let Err(e) = self.on_connected() {
                        if !e.is_recoverable() {
                            return Err(e);
                        }
                        self.lost(now, &e);
                        return Ok(out);
                    }
                    out.connected_now = true;
                    out.first_connect = self.sessions == 1;
                }
                TransportEvent::ConnAck => debug!("ignoring stray CONNACK"),
                TransportEvent::Message(msg) if self.is_connected() => out.inbound.push(msg),
                TransportEvent::Message(msg) => debug!("dropping early message on {}", msg.topic),
            }
        }
        if self.state == ConnectionState::Connecting
            && now.saturating_sub(self.connecting_since) >= Duration::from_secs(MQTT_CONNECT_TIMEOUT_S)
        {
            let _ = self.transport.disconnect();
            self.attempt_failed(now, &MqttError::Recoverable("connect timed out".into()));
        }
        Ok(out)
    }

    fn on_connected(&mut self) -> Result<(), MqttError> {
        self.state = ConnectionState::Connected;
        self.backoff.succeeded();
        self.history.clear();
        self.sessions += 1;
        info!("MQTT connected (session {})", self.sessions);
        self.resubscribe()?;
        let online = OutboundMessage::new(self.topics.connectivity(), PAYLOAD_ONLINE)
            .retained()
            .forced();
        self.send(&online)
    }

    fn resubscribe(&mut self) -> Result<(), MqttError> {
        for topic in &self.subscriptions {
            self.transport.subscribe(topic)?;
            debug!("subscribed {topic}");
        }
        Ok(())
    }

    fn attempt_failed(&mut self, now: Duration, e: &MqttError) {
        self.state = ConnectionState::Disconnected;
        self.backoff.failed(now);
        warn!(
            "MQTT connection failed: {e}; retrying in {}s",
            self.backoff.next_attempt().saturating_sub(now).as_secs()
        );
    }

    fn lost(&mut self, now: Duration, e: &MqttError) {
        match self.state {
            ConnectionState::Connecting => self.attempt_failed(now, e),
            ConnectionState::Connected => {
                self.state = ConnectionState::Disconnected;
                self.backoff.dropped(now);
                warn!(
                    "MQTT connection lost: {e}; reconnecting in {}s",
                    self.backoff.current().as_secs()
                );
            }
            _ => {}
        }
    }

    fn send(&mut self, msg: &OutboundMessage) -> Result<(), MqttError> {
        self.transport
            .publish(&msg.topic, msg.payload_bytes(), msg.retain)?;
        self.history.record(msg);
        Ok(())
    }

    /// Publish one message under change suppression.
    ///
    /// Returns whether it went out. Publishing while not connected is a
    /// recoverable error.
    pub fn publish(&mut self, msg: &OutboundMessage, now: Duration) -> Result<bool, MqttError> {
        if !self.is_connected() {
            return Err(MqttError::Recoverable("publish while not connected".into()));
        }
        if !self.history.should_send(msg, self.in_discovery_window(now)) {
            return Ok(false);
        }
        self.send(msg)?;
        Ok(true)
    }

    /// Publish a batch. Skipped entirely unless connected; a recoverable
    /// failure drops the session and abandons the rest.
    ///
    /// Returns the number of messages transmitted.
    pub fn flush(&mut self, msgs: &[OutboundMessage], now: Duration) -> Result<usize, MqttError> {
        if !self.is_connected() {
            return Ok(0);
        }
        let mut sent = 0;
        for msg in msgs {
            match self.publish(msg, now) {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) if e.is_recoverable() => {
                    self.lost(now, &e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sent)
    }

    /// Planned shutdown: announce `offline` and disconnect cleanly.
    ///
    /// A clean DISCONNECT suppresses the broker's last will, so the offline
    /// state is published explicitly first.
    pub fn shutdown(&mut self, now: Duration) {
        if self.is_connected() {
            let offline = OutboundMessage::new(self.topics.connectivity(), PAYLOAD_OFFLINE).retained();
            if let Err(e) = self.publish(&offline, now) {
                warn!("could not publish offline state: {e}");
            }
        }
        if self.state != ConnectionState::DisconnectPlanned {
            if let Err(e) = self.transport.disconnect() {
                warn!("MQTT disconnect failed: {e}");
            }
            info!("MQTT disconnected");
        }
        self.state = ConnectionState::DisconnectPlanned;
    }

    /// Leave DISCONNECT_PLANNED and allow an immediate attempt.
    pub fn resume(&mut self) {
        if self.state == ConnectionState::DisconnectPlanned {
            self.state = ConnectionState::Disconnected;
            self.backoff = Backoff::new();
        }
    }
}
