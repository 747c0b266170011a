//! Placeholder control with no hardware.

use super::ControlInfo;

/// Stands in for an indicator that has no pin configured.
#[derive(Debug)]
pub struct NullControl {
    info: ControlInfo,
}

impl NullControl {
    /// Placeholder named `id`.
    pub fn new(id: &str) -> Self {
        Self {
            info: ControlInfo {
                id: id.to_string(),
                name: id.to_string(),
                icon: String::new(),
                publish_time: 0,
            },
        }
    }

    /// Identity.
    pub fn info(&self) -> &ControlInfo {
        &self.info
    }
}
