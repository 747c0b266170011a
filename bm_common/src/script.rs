//! Script file schema.
//!
//! One JSON file per script:
//!
//! ```json
//! {
//!   "script": "launch", "type": "flight", "run": "once",
//!   "blocks": [
//!     { "name": "burn1", "run_time": 10, "controls": { "engine": "on" },
//!       "flight": { "final_altitude": 100, "final_velocity": 2000, "met_state": "run" } }
//!   ],
//!   "display_map": { "met": "met", "alt": "alt", "vel": "vel" }
//! }
//! ```
//!
//! Shape checks happen here. Cross references (control ids, display ids)
//! and flight compilation are resolved by the script engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::format::UnitSystem;

/// Script kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    /// Timed control blocks only.
    #[default]
    Basic,
    /// Blocks plus a compiled MET/altitude/velocity timeline.
    Flight,
}

/// Run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Run through once, then stop.
    #[default]
    Once,
    /// Run `loops` times.
    Repeat,
}

/// What happens to controls when the script stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AtCompletion {
    /// Every known control is switched off.
    #[default]
    Off,
    /// Control states captured at start are replayed.
    Restore,
}

/// Mission elapsed time counter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetState {
    /// Counting up once per second.
    Run,
    /// Frozen.
    #[default]
    Hold,
}

/// Rate keyword for `alt` / `vel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateKeyword {
    /// Keep the previous block's rate.
    Glide,
    /// Zero rate.
    Freeze,
}

/// `alt` / `vel` value: an absolute override or a rate keyword.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlightValue {
    /// Absolute value assigned on block entry.
    Literal(f64),
    /// Rate keyword.
    Keyword(RateKeyword),
}

/// Flight sub-record of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightDef {
    /// Altitude reached at the end of the block [km].
    #[serde(default)]
    pub final_altitude: Option<f64>,
    /// Velocity reached at the end of the block [km/h].
    #[serde(default)]
    pub final_velocity: Option<f64>,
    /// Altitude override or keyword.
    #[serde(default)]
    pub alt: Option<FlightValue>,
    /// Velocity override or keyword.
    #[serde(default)]
    pub vel: Option<FlightValue>,
    /// MET counter mode from this block on.
    #[serde(default)]
    pub met_state: Option<MetState>,
    /// Absolute MET at block entry [s].
    #[serde(default)]
    pub met: Option<i64>,
}

/// One block of a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDef {
    /// Optional label, used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// Duration [s], at least 1.
    pub run_time: u32,
    /// Control id → `"on"` / `"off"`.
    #[serde(default)]
    pub controls: BTreeMap<String, String>,
    /// Flight parameters.
    #[serde(default)]
    pub flight: Option<FlightDef>,
}

/// Display ids receiving the flight outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMap {
    /// Mission elapsed time display.
    #[serde(default)]
    pub met: Option<String>,
    /// Altitude display.
    #[serde(default)]
    pub alt: Option<String>,
    /// Velocity display.
    #[serde(default)]
    pub vel: Option<String>,
}

/// A script file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptFile {
    /// Script name, offered in the selector.
    pub script: String,
    /// Basic or flight.
    #[serde(rename = "type", default)]
    pub kind: ScriptKind,
    /// Once or repeat.
    #[serde(default)]
    pub run: RunMode,
    /// Loop count, required for `repeat`.
    #[serde(default)]
    pub loops: Option<u32>,
    /// Stop behaviour.
    #[serde(default)]
    pub at_completion: AtCompletion,
    /// Ordered blocks.
    pub blocks: Vec<BlockDef>,
    /// Flight display routing.
    #[serde(default)]
    pub display_map: Option<DisplayMap>,
    /// Output unit system for flight values.
    #[serde(default)]
    pub units: UnitSystem,
}

impl ScriptFile {
    /// Validate shape.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - the name is empty or one of the reserved selector options
    /// - there are no blocks, or a block has `run_time` 0
    /// - `run` is `repeat` without a positive `loops`
    /// - a control target is not `on`/`off`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.script.trim();
        if name.is_empty() {
            return Err(ConfigError::ValidationError("script name cannot be empty".into()));
        }
        if name.eq_ignore_ascii_case(crate::consts::SCRIPT_INACTIVE)
            || name.eq_ignore_ascii_case(crate::consts::SCRIPT_ABORT)
        {
            return Err(ConfigError::ValidationError(format!(
                "script name '{name}' is reserved"
            )));
        }
        if self.blocks.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "script '{name}' has no blocks"
            )));
        }
        if self.run == RunMode::Repeat && !self.loops.is_some_and(|l| l > 0) {
            return Err(ConfigError::ValidationError(format!(
                "script '{name}' runs repeat but has no positive 'loops'"
            )));
        }
        let length: u64 = self
            .blocks
            .iter()
            .map(|b| u64::from(b.run_time) + 1)
            .sum::<u64>()
            - 1;
        if length > crate::consts::MAX_SCRIPT_LENGTH_S {
            return Err(ConfigError::ValidationError(format!(
                "script '{name}' runs {length} s, longer than {} s",
                crate::consts::MAX_SCRIPT_LENGTH_S
            )));
        }
        for (idx, block) in self.blocks.iter().enumerate() {
            if block.run_time == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "script '{name}' block {idx} has run_time 0"
                )));
            }
            for (control, target) in &block.controls {
                if !matches!(target.to_ascii_lowercase().as_str(), "on" | "off") {
                    return Err(ConfigError::ValidationError(format!(
                        "script '{name}' block {idx}: '{control}' target '{target}' is not on/off"
                    )));
                }
            }
        }
        Ok(())
    }
}
