//! Inbound and outbound message types.

use serde_json::Value;

/// A message queued for publication.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Full topic.
    pub topic: String,
    /// Payload. Strings go out raw, everything else JSON-encoded.
    pub payload: Value,
    /// Broker keeps the last value.
    pub retain: bool,
    /// Publish even if unchanged.
    pub force: bool,
}

impl OutboundMessage {
    /// Non-retained, change-suppressed message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
            force: false,
        }
    }

    /// Mark retained.
    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }

    /// Mark forced.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Wire bytes.
    pub fn payload_bytes(&self) -> Vec<u8> {
        encode_payload(&self.payload)
    }
}

/// Encode a payload for the wire.
pub fn encode_payload(payload: &Value) -> Vec<u8> {
    match payload {
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Full topic.
    pub topic: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    /// Create an inbound message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Payload as trimmed text. A JSON string literal (`"\"on\""`) is unwrapped.
    pub fn text(&self) -> String {
        let raw = String::from_utf8_lossy(&self.payload);
        let trimmed = raw.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(s)) => s.trim().to_string(),
            _ => trimmed.to_string(),
        }
    }
}
