//! Control configuration structs.
//!
//! Deserialized from the `controls` array. `pins` accepts three shapes:
//!
//! - a bare identifier (string or integer) for a single pin: `"pins": 5`
//! - an `{on, off}` object for a latching split pair: `"pins": {"on": 5, "off": 6}`
//! - a list of the former for a flasher: `"pins": [5, 6, {"on": 7, "off": 8}]`

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, validate_id};
use crate::consts::{DEFAULT_ICON, DEFAULT_LOITER_MS, DEFAULT_SWITCH_MS};

// ─── PinName ────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPinName {
    Number(u64),
    Text(String),
}

/// Pin identifier as written in the config, normalised to a string.
///
/// Resolution to a physical line happens in the HAL pin map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawPinName", into = "String")]
pub struct PinName(String);

impl PinName {
    /// Create a pin name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// The name as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawPinName> for PinName {
    fn from(raw: RawPinName) -> Self {
        match raw {
            RawPinName::Number(n) => Self(n.to_string()),
            RawPinName::Text(s) => Self::new(s),
        }
    }
}

impl From<PinName> for String {
    fn from(name: PinName) -> Self {
        name.0
    }
}

impl From<&str> for PinName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for PinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── PinRef / PinsSpec ──────────────────────────────────────────────

/// One logical output: a single line or a latching on/off pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinRef {
    /// Latching relay: pulse `on` to energize, `off` to release.
    Split {
        /// Drive-on line.
        on: PinName,
        /// Drive-off line.
        off: PinName,
    },
    /// Plain on/off line.
    Single(PinName),
}

impl PinRef {
    /// Every underlying pin name.
    pub fn names(&self) -> Vec<&PinName> {
        match self {
            Self::Split { on, off } => vec![on, off],
            Self::Single(pin) => vec![pin],
        }
    }
}

/// The `pins` value of a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinsSpec {
    /// List of outputs (flasher).
    Many(Vec<PinRef>),
    /// One output.
    One(PinRef),
}

impl PinsSpec {
    /// Flatten into the list of logical outputs.
    pub fn refs(&self) -> Vec<&PinRef> {
        match self {
            Self::Many(list) => list.iter().collect(),
            Self::One(one) => vec![one],
        }
    }
}

// ─── ControlConfig ──────────────────────────────────────────────────

/// Control variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    /// One output, simple on/off.
    #[default]
    Single,
    /// Rotating sequence of outputs.
    Flasher,
}

/// One entry of the `controls` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Stable id, no whitespace. Used in topics.
    pub id: String,
    /// Pin specification.
    pub pins: PinsSpec,
    /// Variant.
    #[serde(rename = "type", default)]
    pub control_type: ControlType,
    /// Friendly name. Defaults to `id`.
    #[serde(default)]
    pub name: Option<String>,
    /// Icon hint for the UI.
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Invert logic-to-pin mapping.
    #[serde(default)]
    pub active_low: bool,
    /// I²C address of a GPIO expander hosting the pins, as hex (`"0x20"`).
    #[serde(default)]
    pub extio: Option<String>,
    /// Flasher dwell with an element lit [ms].
    #[serde(default = "default_loiter")]
    pub loiter_time: u64,
    /// Flasher dark gap before the next element [ms].
    #[serde(default = "default_switch")]
    pub switch_time: u64,
    /// Skip this entry.
    #[serde(default)]
    pub disable: bool,
    /// Seconds between forced state republications (reserved).
    #[serde(default)]
    pub publish_time: Option<u64>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_loiter() -> u64 {
    DEFAULT_LOITER_MS
}

fn default_switch() -> u64 {
    DEFAULT_SWITCH_MS
}

impl ControlConfig {
    /// Friendly name, falling back to the id.
    pub fn friendly_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Expander address if `extio` is set.
    pub fn expander_address(&self) -> Result<Option<u8>, ConfigError> {
        self.extio.as_deref().map(parse_hex_address).transpose()
    }

    /// Validate shape and values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `id` is empty or contains whitespace
    /// - a single control lists more than one output
    /// - a flasher has no outputs or a zero `loiter_time`
    /// - `extio` is not a hex address
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_id("control id", &self.id)?;
        let refs = self.pins.refs();
        match self.control_type {
            ControlType::Single if refs.len() != 1 => {
                return Err(ConfigError::ValidationError(format!(
                    "single control '{}' needs exactly one pin, got {}",
                    self.id,
                    refs.len()
                )));
            }
            ControlType::Flasher if refs.is_empty() => {
                return Err(ConfigError::ValidationError(format!(
                    "flasher '{}' needs at least one pin",
                    self.id
                )));
            }
            ControlType::Flasher if self.loiter_time == 0 => {
                return Err(ConfigError::ValidationError(format!(
                    "flasher '{}' loiter_time must be positive",
                    self.id
                )));
            }
            _ => {}
        }
        for pin in refs.iter().flat_map(|r| r.names()) {
            if pin.as_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "control '{}' has an empty pin identifier",
                    self.id
                )));
            }
        }
        self.expander_address()?;
        Ok(())
    }
}

/// Parse a hex I²C address such as `"0x20"` or `"20"`.
pub fn parse_hex_address(text: &str) -> Result<u8, ConfigError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u8::from_str_radix(digits, 16)
        .map_err(|_| ConfigError::ValidationError(format!("'{text}' is not a hex I2C address")))
}
