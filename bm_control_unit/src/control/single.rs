//! Single-pin control.

use bm_common::hal::driver::HalError;
use bm_hal::PinHandle;
use tracing::debug;

use super::{ControlInfo, ControlStatus};

/// One output on one pin handle.
#[derive(Debug)]
pub struct SingleControl {
    info: ControlInfo,
    pin: PinHandle,
    on: bool,
}

impl SingleControl {
    /// Wrap a claimed pin handle. The handle is already driven off.
    pub fn new(info: ControlInfo, pin: PinHandle) -> Self {
        Self {
            info,
            pin,
            on: false,
        }
    }

    /// Identity.
    pub fn info(&self) -> &ControlInfo {
        &self.info
    }

    /// `ON` or `OFF`.
    pub fn status(&self) -> ControlStatus {
        if self.on {
            ControlStatus::On
        } else {
            ControlStatus::Off
        }
    }

    /// Drive the pin. Repeating the current value rewrites the same level.
    pub fn set(&mut self, on: bool) -> Result<(), HalError> {
        self.pin.set_value(on)?;
        if self.on != on {
            debug!("control '{}' -> {}", self.info.id, if on { "ON" } else { "OFF" });
        }
        self.on = on;
        Ok(())
    }

    /// Logical level read back from the hardware.
    pub fn read_back(&self) -> Result<bool, HalError> {
        self.pin.value()
    }
}
