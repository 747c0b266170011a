//! MQTT error type.

use thiserror::Error;

/// Errors from the transport and adapter, tagged by how the loop reacts.
#[derive(Debug, Clone, Error)]
pub enum MqttError {
    /// Broker unreachable, connection reset, publish while disconnected.
    /// The adapter drops to DISCONNECTED and retries with backoff.
    #[error("MQTT (recoverable): {0}")]
    Recoverable(String),

    /// Misconfiguration the adapter cannot retry its way out of.
    #[error("MQTT (fatal): {0}")]
    Fatal(String),
}

impl MqttError {
    /// Whether the adapter should back off and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}
