//! Change-suppressed publication.
//!
//! Remembers the last payload sent per topic. A message goes out iff the
//! topic is new, the message is forced, or the payload differs. Payloads
//! are compared as `serde_json::Value`, so objects compare key-wise and
//! `1` never equals `"1"`.

use serde_json::Value;
use std::collections::HashMap;

use crate::message::OutboundMessage;

/// Last-sent payload per topic.
#[derive(Debug, Clone, Default)]
pub struct TopicHistory {
    last: HashMap<String, Value>,
}

impl TopicHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `msg` must be transmitted. `force_all` overrides suppression.
    pub fn should_send(&self, msg: &OutboundMessage, force_all: bool) -> bool {
        if msg.force || force_all {
            return true;
        }
        self.last.get(&msg.topic) != Some(&msg.payload)
    }

    /// Store what was sent.
    pub fn record(&mut self, msg: &OutboundMessage) {
        self.last.insert(msg.topic.clone(), msg.payload.clone());
    }

    /// Last payload sent on `topic`.
    pub fn last(&self, topic: &str) -> Option<&Value> {
        self.last.get(topic)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.last.clear();
    }

    /// Number of topics tracked.
    pub fn len(&self) -> usize {
        self.last.len()
    }

    /// True if nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
