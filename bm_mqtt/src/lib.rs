//! # BrickMaster MQTT Bridge
//!
//! Broker session management for the control node.
//!
//! # Module Structure
//!
//! - [`adapter`] - Lifecycle state machine, subscriptions, change-suppressed publish
//! - [`connection`] - Connection states and reconnect backoff
//! - [`discovery`] - Home Assistant discovery payloads
//! - [`history`] - Last payload per topic
//! - [`message`] - Inbound/outbound message types
//! - [`topics`] - Topic builders and inbound routing
//! - [`transport`] - Byte-level client seam (`rumqttc`, in-memory)
//!
//! # Data Flow
//!
//! ```text
//!   broker ──► transport.poll ──► adapter.poll ──► InboundMessage ──► control loop
//!                                                                        │
//!   broker ◄── transport.publish ◄── TopicHistory ◄── adapter.flush ◄────┘
//! ```

#![deny(missing_docs)]

pub mod adapter;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod history;
pub mod message;
pub mod topics;
pub mod transport;

pub use crate::adapter::{AdapterPoll, MqttAdapter};
pub use crate::connection::{Backoff, ConnectionState};
pub use crate::discovery::{ControlEntity, DiscoveryContext, discovery_messages};
pub use crate::error::MqttError;
pub use crate::message::{InboundMessage, OutboundMessage};
pub use crate::topics::{InboundTopic, Topics};
pub use crate::transport::{ConnectOptions, MemoryTransport, MqttTransport, RumqttcTransport};
