//! Controls: named on/off outputs driven by MQTT commands and scripts.
//!
//! Three variants share one capability set (`set`, `status`, `tick`,
//! `callback`, `topics`):
//!
//! - [`single::SingleControl`] - one pin handle
//! - [`flasher::FlasherControl`] - rotates through a list of pin handles
//! - [`null::NullControl`] - placeholder with no hardware

pub mod flasher;
pub mod null;
pub mod single;

use bm_common::hal::driver::HalError;
use bm_mqtt::{OutboundMessage, Topics};
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub use flasher::FlasherControl;
pub use null::NullControl;
pub use single::SingleControl;

/// Externally visible control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// Output energized (or flasher running).
    On,
    /// Output off.
    Off,
    /// No hardware behind this control.
    Unavailable,
}

impl ControlStatus {
    /// Wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive `on`/`off`.
pub fn parse_switch(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("on") {
        Some(true)
    } else if value.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

/// Identity shared by every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    /// Stable id.
    pub id: String,
    /// Friendly name.
    pub name: String,
    /// Icon hint.
    pub icon: String,
    /// Seconds between forced republications. Carried, not acted on.
    pub publish_time: u64,
}

/// A control of any variant.
#[derive(Debug)]
pub enum Control {
    /// Single pin.
    Single(SingleControl),
    /// Rotating pin list.
    Flasher(FlasherControl),
    /// Placeholder.
    Null(NullControl),
}

impl Control {
    /// Identity.
    pub fn info(&self) -> &ControlInfo {
        match self {
            Self::Single(c) => c.info(),
            Self::Flasher(c) => c.info(),
            Self::Null(c) => c.info(),
        }
    }

    /// Stable id.
    pub fn id(&self) -> &str {
        &self.info().id
    }

    /// Current status.
    pub fn status(&self) -> ControlStatus {
        match self {
            Self::Single(c) => c.status(),
            Self::Flasher(c) => c.status(),
            Self::Null(_) => ControlStatus::Unavailable,
        }
    }

    /// Drive to `value` (`on`/`off`, any case). Other values are logged and ignored.
    ///
    /// # Errors
    /// Only hardware failures.
    pub fn set(&mut self, value: &str, now: Duration) -> Result<(), HalError> {
        let Some(on) = parse_switch(value) else {
            warn!("control '{}': ignoring value '{value}'", self.id());
            return Ok(());
        };
        self.set_on(on, now)
    }

    /// Drive on or off.
    pub fn set_on(&mut self, on: bool, now: Duration) -> Result<(), HalError> {
        match self {
            Self::Single(c) => c.set(on),
            Self::Flasher(c) => c.set(on, now),
            Self::Null(_) => Ok(()),
        }
    }

    /// Advance time-driven behaviour.
    pub fn tick(&mut self, now: Duration) -> Result<(), HalError> {
        match self {
            Self::Flasher(c) => c.tick(now),
            Self::Single(_) | Self::Null(_) => Ok(()),
        }
    }

    /// Whether `tick` has work to do.
    pub fn is_animating(&self) -> bool {
        matches!(self, Self::Flasher(c) if c.is_running())
    }

    /// Inbound command payload.
    pub fn callback(&mut self, payload: &str, now: Duration) -> Result<(), HalError> {
        self.set(payload, now)
    }

    /// Topics this control uses: command topic first.
    pub fn topics(&self, topics: &Topics) -> Vec<String> {
        let id = self.id();
        let mut out = vec![topics.control_set(id), topics.control_status(id)];
        if let Self::Flasher(_) = self {
            out.extend(
                bm_mqtt::topics::FLASHER_FIELDS
                    .iter()
                    .map(|field| topics.control_field(id, field)),
            );
        }
        out
    }

    /// State messages for the current iteration.
    pub fn outbound(&self, topics: &Topics) -> Vec<OutboundMessage> {
        let id = self.id();
        let mut out =
            vec![OutboundMessage::new(topics.control_status(id), self.status().as_str()).retained()];
        if let Self::Flasher(c) = self {
            out.push(OutboundMessage::new(topics.control_field(id, "seq_pos"), c.position()));
            out.push(OutboundMessage::new(topics.control_field(id, "loiter_time"), c.loiter_ms()));
            out.push(OutboundMessage::new(topics.control_field(id, "switch_time"), c.switch_ms()));
        }
        out
    }

    /// Drive off and verify. Used on every exit path.
    pub fn shutdown(&mut self, now: Duration) -> Result<(), HalError> {
        self.set_on(false, now)
    }
}

/// Owning container of controls, in config order.
#[derive(Debug, Default)]
pub struct Controls {
    items: Vec<Control>,
}

impl Controls {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a control.
    pub fn push(&mut self, control: Control) {
        self.items.push(control);
    }

    /// Look up by id.
    pub fn get(&self, id: &str) -> Option<&Control> {
        self.items.iter().find(|c| c.id() == id)
    }

    /// Look up by id, mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.items.iter_mut().find(|c| c.id() == id)
    }

    /// All controls.
    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.items.iter()
    }

    /// All controls, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Control> {
        self.items.iter_mut()
    }

    /// Ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|c| c.id().to_string()).collect()
    }

    /// Number of controls.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
