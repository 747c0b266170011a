//! Display configuration (`displays` section).

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, validate_id};
use crate::consts::DEFAULT_BRIGHTNESS;
use crate::hal::types::DisplayKind;
use crate::io::config::parse_hex_address;

/// What a display shows while no script drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdleMode {
    /// Wall-clock time `HH:MM`.
    Time,
    /// Calendar date `MM.DD`.
    Date,
    /// Dark.
    #[default]
    Blank,
}

/// Idle behaviour, either a bare mode or a detailed object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdleConfig {
    /// `"idle": "time"`
    Mode(IdleMode),
    /// `"idle": {"show": "time", "brightness": 0.5, "clock": 12}`
    Detailed {
        /// Idle view.
        show: IdleMode,
        /// Brightness 0.0–1.0.
        #[serde(default = "default_brightness")]
        brightness: f32,
        /// 12- or 24-hour clock.
        #[serde(default = "default_clock")]
        clock: u8,
    },
}

fn default_brightness() -> f32 {
    DEFAULT_BRIGHTNESS
}

fn default_clock() -> u8 {
    24
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self::Mode(IdleMode::Blank)
    }
}

impl IdleConfig {
    /// Idle view.
    pub fn show(&self) -> IdleMode {
        match *self {
            Self::Mode(mode) => mode,
            Self::Detailed { show, .. } => show,
        }
    }

    /// Brightness 0.0–1.0.
    pub fn brightness(&self) -> f32 {
        match *self {
            Self::Mode(_) => DEFAULT_BRIGHTNESS,
            Self::Detailed { brightness, .. } => brightness,
        }
    }

    /// 12- or 24-hour clock.
    pub fn clock_hours(&self) -> u8 {
        match *self {
            Self::Mode(_) => default_clock(),
            Self::Detailed { clock, .. } => clock,
        }
    }
}

/// One entry of the `displays` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Display id, referenced by script display maps.
    pub id: String,
    /// Hardware variant.
    #[serde(rename = "type")]
    pub kind: DisplayKind,
    /// I²C address as hex (`"0x70"`).
    pub address: String,
    /// Idle behaviour.
    #[serde(default)]
    pub idle: IdleConfig,
}

impl DisplayConfig {
    /// Parsed I²C address.
    pub fn i2c_address(&self) -> Result<u8, ConfigError> {
        parse_hex_address(&self.address)
    }

    /// Validate id, address, brightness range and clock.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_id("display id", &self.id)?;
        self.i2c_address()?;
        let brightness = self.idle.brightness();
        if !(0.0..=1.0).contains(&brightness) {
            return Err(ConfigError::ValidationError(format!(
                "display '{}' brightness {brightness} outside [0, 1]",
                self.id
            )));
        }
        if !matches!(self.idle.clock_hours(), 12 | 24) {
            return Err(ConfigError::ValidationError(format!(
                "display '{}' clock must be 12 or 24",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idle_string_form() {
        let d: DisplayConfig = serde_json::from_value(json!({
            "id": "met", "type": "seg7x4", "address": "0x70", "idle": "time"
        }))
        .unwrap();
        assert_eq!(d.idle.show(), IdleMode::Time);
        assert_eq!(d.idle.brightness(), 1.0);
        assert_eq!(d.i2c_address().unwrap(), 0x70);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn idle_object_form() {
        let d: DisplayConfig = serde_json::from_value(json!({
            "id": "alt", "type": "bigseg7x4", "address": "71",
            "idle": { "show": "date", "brightness": 0.25, "clock": 12 }
        }))
        .unwrap();
        assert_eq!(d.idle.show(), IdleMode::Date);
        assert_eq!(d.idle.brightness(), 0.25);
        assert_eq!(d.idle.clock_hours(), 12);
    }

    #[test]
    fn idle_defaults_blank() {
        let d: DisplayConfig = serde_json::from_value(json!({
            "id": "vel", "type": "seg7x4", "address": "0x72"
        }))
        .unwrap();
        assert_eq!(d.idle.show(), IdleMode::Blank);
    }

    #[test]
    fn brightness_out_of_range_rejected() {
        let d: DisplayConfig = serde_json::from_value(json!({
            "id": "vel", "type": "seg7x4", "address": "0x72",
            "idle": { "show": "time", "brightness": 1.5 }
        }))
        .unwrap();
        assert!(d.validate().is_err());
    }
}
