//! Control unit error type.
//!
//! Wraps the layer errors so `main` can map any failure to exit code 1.

use bm_common::config::ConfigError;
use bm_common::hal::driver::HalError;
use bm_mqtt::MqttError;
use thiserror::Error;

use crate::script::ScriptError;

/// Anything that stops the node.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be loaded or is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Pin, bus or display failure.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Script failed to load or compile.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Non-recoverable broker problem.
    #[error(transparent)]
    Mqtt(#[from] MqttError),

    /// Another instance holds the PID file.
    #[error("already running: {0}")]
    AlreadyRunning(String),

    /// Process-level setup (PID file, signal handlers).
    #[error("system error: {0}")]
    System(String),
}

impl From<nix::Error> for CoreError {
    fn from(e: nix::Error) -> Self {
        Self::System(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::System(e.to_string())
    }
}
