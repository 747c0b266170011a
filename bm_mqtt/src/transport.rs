//! MQTT transport seam.
//!
//! The adapter owns the connection policy; a transport only moves bytes.
//!
//! - [`RumqttcTransport`] - synchronous `rumqttc::Client`, one client per attempt
//! - [`MemoryTransport`] - in-process broker stand-in for tests

use parking_lot::Mutex;
use rumqttc::{
    Client, ConnectionError, Event, LastWill, MqttOptions, Packet, QoS, RecvTimeoutError,
    TryRecvError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::MqttError;
use crate::message::InboundMessage;

/// Events drained from the transport by one poll.
const MAX_EVENTS_PER_POLL: usize = 64;

/// Request queue depth of the rumqttc client.
const CLIENT_CAPACITY: usize = 64;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Client id presented to the broker.
    pub client_id: String,
    /// Broker host.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Optional credentials.
    pub credentials: Option<(String, String)>,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Last will: topic and payload, published retained.
    pub last_will: (String, String),
}

/// Something the broker told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection accepted.
    ConnAck,
    /// Publication on a subscribed topic.
    Message(InboundMessage),
}

/// Byte-level MQTT client.
pub trait MqttTransport {
    /// Start a connection attempt. Acknowledgement arrives through `poll`.
    fn connect(&mut self, options: &ConnectOptions) -> Result<(), MqttError>;

    /// Wait up to `timeout` for broker traffic.
    ///
    /// # Errors
    /// `MqttError::Recoverable` when the attempt is refused or the session drops.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<TransportEvent>, MqttError>;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError>;

    /// Publish bytes.
    fn publish(&mut self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError>;

    /// Close the session cleanly.
    fn disconnect(&mut self) -> Result<(), MqttError>;
}

// ─── rumqttc ────────────────────────────────────────────────────────

/// Transport over the synchronous `rumqttc` client.
#[derive(Default)]
pub struct RumqttcTransport {
    session: Option<(Client, rumqttc::Connection)>,
}

impl RumqttcTransport {
    /// Transport with no session.
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, MqttError> {
        self.session
            .as_ref()
            .map(|(client, _)| client)
            .ok_or_else(|| MqttError::Recoverable("no session".into()))
    }

    fn handle(&mut self, event: Event, out: &mut Vec<TransportEvent>) {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => out.push(TransportEvent::ConnAck),
            Event::Incoming(Packet::Publish(p)) => {
                out.push(TransportEvent::Message(InboundMessage::new(
                    p.topic,
                    p.payload.to_vec(),
                )));
            }
            other => trace!("mqtt event {other:?}"),
        }
    }

    fn fail(&mut self, e: ConnectionError) -> MqttError {
        self.session = None;
        MqttError::Recoverable(e.to_string())
    }
}

impl MqttTransport for RumqttcTransport {
    fn connect(&mut self, options: &ConnectOptions) -> Result<(), MqttError> {
        if options.host.trim().is_empty() {
            return Err(MqttError::Fatal("broker host is empty".into()));
        }
        let mut mqtt = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt.set_keep_alive(options.keep_alive);
        mqtt.set_clean_session(true);
        if let Some((user, key)) = &options.credentials {
            mqtt.set_credentials(user, key);
        }
        let (topic, payload) = &options.last_will;
        mqtt.set_last_will(LastWill::new(
            topic,
            payload.as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
        ));
        self.session = Some(Client::new(mqtt, CLIENT_CAPACITY));
        debug!("mqtt connecting to {}:{}", options.host, options.port);
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<TransportEvent>, MqttError> {
        let mut out = Vec::new();
        let Some((_, connection)) = self.session.as_mut() else {
            return Err(MqttError::Recoverable("no session".into()));
        };
        let first = match connection.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => return Ok(out),
            Err(RecvTimeoutError::Disconnected) => {
                self.session = None;
                return Err(MqttError::Recoverable("event loop closed".into()));
            }
        };
        let mut events = Vec::new();
        match first {
            Ok(event) => events.push(event),
            Err(e) => return Err(self.fail(e)),
        }
        while events.len() < MAX_EVENTS_PER_POLL {
            let Some((_, connection)) = self.session.as_mut() else {
                break;
            };
            match connection.try_recv() {
                Ok(Ok(event)) => events.push(event),
                Ok(Err(e)) => return Err(self.fail(e)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.session = None;
                    return Err(MqttError::Recoverable("event loop closed".into()));
                }
            }
        }
        for event in events {
            self.handle(event, &mut out);
        }
        Ok(out)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.client()?
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| MqttError::Recoverable(e.to_string()))
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        self.client()?
            .try_publish(topic, QoS::AtLeastOnce, retain, payload)
            .map_err(|e| MqttError::Recoverable(e.to_string()))
    }

    fn disconnect(&mut self) -> Result<(), MqttError> {
        if let Some((client, mut connection)) = self.session.take() {
            client
                .try_disconnect()
                .map_err(|e| MqttError::Recoverable(e.to_string()))?;
            // Let the event loop flush queued publishes and the DISCONNECT.
            for _ in 0..MAX_EVENTS_PER_POLL {
                match connection.recv_timeout(Duration::from_millis(100)) {
                    Ok(Ok(_)) => {}
                    _ => break,
                }
            }
        }
        Ok(())
    }
}

// ─── in-memory ──────────────────────────────────────────────────────

/// A publication seen by the in-memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Topic.
    pub topic: String,
    /// Payload as text.
    pub payload: String,
    /// Retain flag.
    pub retain: bool,
}

#[derive(Debug, Default)]
struct Broker {
    online: bool,
    session: bool,
    pending_connect: bool,
    drop_next_poll: bool,
    attempts: usize,
    last_options: Option<ConnectOptions>,
    inbound: VecDeque<InboundMessage>,
    published: Vec<Published>,
    subscriptions: Vec<String>,
    disconnects: usize,
}

/// In-process transport. Clones share one broker so tests keep a handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    broker: Arc<Mutex<Broker>>,
}

impl MemoryTransport {
    /// Broker that accepts connections.
    pub fn new() -> Self {
        let t = Self::default();
        t.set_online(true);
        t
    }

    /// Accept (`true`) or refuse further connection attempts.
    pub fn set_online(&self, online: bool) {
        self.broker.lock().online = online;
    }

    /// Reset the current session on the next poll.
    pub fn drop_session(&self) {
        self.broker.lock().drop_next_poll = true;
    }

    /// Deliver a message on the next poll.
    pub fn inject(&self, topic: &str, payload: &str) {
        self.broker
            .lock()
            .inbound
            .push_back(InboundMessage::new(topic, payload.as_bytes().to_vec()));
    }

    /// Number of connection attempts so far.
    pub fn attempts(&self) -> usize {
        self.broker.lock().attempts
    }

    /// Options of the latest attempt.
    pub fn last_options(&self) -> Option<ConnectOptions> {
        self.broker.lock().last_options.clone()
    }

    /// Whether a session is up.
    pub fn has_session(&self) -> bool {
        self.broker.lock().session
    }

    /// Every publication so far.
    pub fn published(&self) -> Vec<Published> {
        self.broker.lock().published.clone()
    }

    /// Publications on one topic.
    pub fn published_on(&self, topic: &str) -> Vec<Published> {
        self.broker
            .lock()
            .published
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    /// Forget recorded publications.
    pub fn clear_published(&self) {
        self.broker.lock().published.clear();
    }

    /// Current subscriptions.
    pub fn subscriptions(&self) -> Vec<String> {
        self.broker.lock().subscriptions.clone()
    }

    /// Clean disconnects so far.
    pub fn disconnects(&self) -> usize {
        self.broker.lock().disconnects
    }
}

impl MqttTransport for MemoryTransport {
    fn connect(&mut self, options: &ConnectOptions) -> Result<(), MqttError> {
        let mut b = self.broker.lock();
        b.attempts += 1;
        b.last_options = Some(options.clone());
        b.session = false;
        b.pending_connect = true;
        b.subscriptions.clear();
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<TransportEvent>, MqttError> {
        let mut b = self.broker.lock();
        if b.pending_connect {
            b.pending_connect = false;
            if !b.online {
                return Err(MqttError::Recoverable("connection refused".into()));
            }
            b.session = true;
            return Ok(vec![TransportEvent::ConnAck]);
        }
        if !b.session {
            return Err(MqttError::Recoverable("no session".into()));
        }
        if b.drop_next_poll {
            b.drop_next_poll = false;
            b.session = false;
            return Err(MqttError::Recoverable("connection reset by peer".into()));
        }
        Ok(b.inbound.drain(..).map(TransportEvent::Message).collect())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        let mut b = self.broker.lock();
        if !b.session {
            return Err(MqttError::Recoverable("subscribe without session".into()));
        }
        if !b.subscriptions.iter().any(|t| t == topic) {
            b.subscriptions.push(topic.to_string());
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError> {
        let mut b = self.broker.lock();
        if !b.session {
            return Err(MqttError::Recoverable("publish without session".into()));
        }
        b.published.push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(&payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), MqttError> {
        let mut b = self.broker.lock();
        if b.session {
            b.disconnects += 1;
        }
        b.session = false;
        b.pending_connect = false;
        Ok(())
    }
}
