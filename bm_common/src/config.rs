//! Configuration loading traits and types.
//!
//! The node is configured by one JSON document with the sections
//! `system`, `controls`, `displays`, `scripts` and optionally `sensors`.
//!
//! Loading is deliberately forgiving per entity and strict per section:
//! a missing or malformed `system` section is fatal, while a malformed
//! entry in `controls` or `displays` is dropped with a critical log line
//! and the remaining entries survive.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bm_common::config::{BrickConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BrickConfig::load(Path::new("brickmaster.json"))?;
//!     println!("System: {}", config.system.id);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::consts::{
    DEFAULT_HA_BASE, DEFAULT_INTERFACE, DEFAULT_MQTT_PORT, DEFAULT_PUBLISH_TIME_S,
};
use crate::hal::config::DisplayConfig;
use crate::io::config::{ControlConfig, PinName};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// JSON parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Fetching a network configuration failed.
    #[error("Failed to fetch configuration: {0}")]
    FetchError(String),
}

/// Log level for application logging.
///
/// Mirrors the `system.log_level` values accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Potentially problematic situations.
    Warning,
    /// Serious problems.
    Error,
    /// Problems that drop configuration or stop the node.
    Critical,
}

impl LogLevel {
    /// Map to the closest `tracing` level. `Critical` has no own level.
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

/// Trait for loading configuration from JSON files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type, so
/// any schema struct (for example a script file) loads the same way.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if JSON syntax or shape is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a JSON file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::ParseError(format!("{}: {e}", path.display()))
        }
    })
}

// ─── system ─────────────────────────────────────────────────────────

/// MQTT broker connection settings (`system.mqtt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub broker: String,
    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional user name passed through to the broker.
    #[serde(default)]
    pub user: Option<String>,
    /// Optional password passed through to the broker. Never dumped.
    #[serde(default, serialize_with = "redact")]
    pub key: Option<String>,
    /// Enable client library logging.
    #[serde(default)]
    pub log: bool,
}

fn default_port() -> u16 {
    DEFAULT_MQTT_PORT
}

fn redact<S: Serializer>(key: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(_) => s.serialize_str("********"),
        None => s.serialize_none(),
    }
}

/// Optional status indicator pins (`system.indicators`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Lit while the main loop runs.
    #[serde(default)]
    pub sysrun: Option<PinName>,
    /// Lit while connected to the broker.
    #[serde(default)]
    pub neton: Option<PinName>,
    /// Lit while not connected to the broker. Requires `neton`.
    #[serde(default)]
    pub netoff: Option<PinName>,
}

/// Memory telemetry layout announced through discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemInfoFormat {
    /// One sensor: percent available.
    #[default]
    #[serde(rename = "unified")]
    Unified,
    /// One sensor: percent used.
    #[serde(rename = "unified-used")]
    UnifiedUsed,
    /// Two sensors: percent used and percent available.
    #[serde(rename = "split-pct")]
    SplitPct,
    /// Four sensors: bytes available, bytes total, both percentages.
    #[serde(rename = "split-all")]
    SplitAll,
}

/// Home Assistant integration (`system.ha`). Presence enables discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaConfig {
    /// Suggested area for the device.
    #[serde(default)]
    pub area: Option<String>,
    /// Discovery topic prefix.
    #[serde(default = "default_ha_base")]
    pub base: String,
    /// Memory telemetry layout.
    #[serde(default)]
    pub meminfo: MemInfoFormat,
}

fn default_ha_base() -> String {
    DEFAULT_HA_BASE.to_string()
}

/// The `system` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Short system id, no whitespace. Used in every topic.
    pub id: String,
    /// Friendly name. Defaults to `id`.
    #[serde(default)]
    pub name: Option<String>,
    /// Broker settings.
    pub mqtt: MqttConfig,
    /// Whether the I²C bus is available (displays, expanders).
    #[serde(default)]
    pub i2c: bool,
    /// Network interface whose MAC address identifies the board.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Logging verbosity.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Seconds between telemetry samples.
    #[serde(default = "default_publish_time")]
    pub publish_time: u64,
    /// Status indicator pins.
    #[serde(default)]
    pub indicators: IndicatorConfig,
    /// Home Assistant discovery settings.
    #[serde(default)]
    pub ha: Option<HaConfig>,
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

fn default_publish_time() -> u64 {
    DEFAULT_PUBLISH_TIME_S
}

impl SystemConfig {
    /// Friendly name, falling back to the id.
    pub fn friendly_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Validate the section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `id` is empty or contains whitespace
    /// - `mqtt.broker` is empty
    /// - `publish_time` is zero
    /// - `indicators.netoff` is set without `indicators.neton`
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_id("system.id", &self.id)?;
        if self.mqtt.broker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "system.mqtt.broker cannot be empty".to_string(),
            ));
        }
        if self.publish_time == 0 {
            return Err(ConfigError::ValidationError(
                "system.publish_time must be at least 1".to_string(),
            ));
        }
        if self.indicators.netoff.is_some() && self.indicators.neton.is_none() {
            return Err(ConfigError::ValidationError(
                "system.indicators.netoff requires system.indicators.neton".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate an identifier used inside topics.
pub fn validate_id(what: &str, id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::ValidationError(format!("{what} cannot be empty")));
    }
    if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '+' || c == '#') {
        return Err(ConfigError::ValidationError(format!(
            "{what} '{id}' must not contain whitespace or topic separators"
        )));
    }
    Ok(())
}

// ─── scripts ────────────────────────────────────────────────────────

/// The `scripts` section: where script files come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Load every `*.json` in `dir`.
    #[serde(default)]
    pub scan_dir: bool,
    /// Script directory. Relative paths resolve against the config file.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Explicit script files. Relative paths resolve against `dir`.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl ScriptsConfig {
    /// Resolve every script path, de-duplicated, in load order.
    ///
    /// A directory that cannot be scanned is logged and skipped.
    pub fn script_paths(&self, base: &Path) -> Vec<PathBuf> {
        let dir = self.dir.as_ref().map(|d| resolve_path(base, d));
        let mut paths = Vec::new();

        if self.scan_dir {
            match &dir {
                Some(dir) => match std::fs::read_dir(dir) {
                    Ok(entries) => {
                        let mut found: Vec<PathBuf> = entries
                            .filter_map(Result::ok)
                            .map(|e| e.path())
                            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                            .collect();
                        found.sort();
                        paths.extend(found);
                    }
                    Err(e) => error!("CRITICAL: cannot scan script dir {}: {e}", dir.display()),
                },
                None => error!("CRITICAL: scripts.scan_dir set without scripts.dir"),
            }
        }

        let file_base = dir.as_deref().unwrap_or(base);
        for file in &self.files {
            paths.push(resolve_path(file_base, file));
        }

        let mut seen = HashSet::new();
        paths.retain(|p| seen.insert(p.clone()));
        paths
    }
}

/// Resolve a possibly relative path against a base directory.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ─── whole document ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    system: Option<Value>,
    #[serde(default)]
    controls: Option<Vec<Value>>,
    #[serde(default)]
    displays: Vec<Value>,
    #[serde(default)]
    scripts: Option<Value>,
    #[serde(default)]
    sensors: Option<Value>,
}

/// Validated configuration with malformed entities already dropped.
#[derive(Debug, Clone, Serialize)]
pub struct BrickConfig {
    /// The `system` section.
    pub system: SystemConfig,
    /// Surviving, enabled controls in file order.
    pub controls: Vec<ControlConfig>,
    /// Surviving displays in file order.
    pub displays: Vec<DisplayConfig>,
    /// Script sources.
    pub scripts: ScriptsConfig,
    /// Sensor section, carried unparsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Value>,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl BrickConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {:?}", path);
        let content = read_file(path)?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_json_str(&content, base)
    }

    /// Parse and validate a config document.
    pub fn from_json_str(content: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_value(value, base_dir)
    }

    /// Validate an already parsed document.
    ///
    /// # Errors
    ///
    /// Fatal only for whole-section problems: missing/invalid `system`,
    /// missing `controls`, or an unparsable `scripts` section.
    pub fn from_value(value: Value, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let system_value = raw
            .system
            .ok_or_else(|| ConfigError::ValidationError("missing 'system' section".to_string()))?;
        let system: SystemConfig = serde_json::from_value(system_value)
            .map_err(|e| ConfigError::ParseError(format!("system: {e}")))?;
        system.validate()?;

        let control_values = raw.controls.ok_or_else(|| {
            ConfigError::ValidationError("missing 'controls' section".to_string())
        })?;
        let controls = filter_controls(control_values);
        let displays = filter_displays(raw.displays);

        let scripts = match raw.scripts {
            Some(v) => serde_json::from_value(v)
                .map_err(|e| ConfigError::ParseError(format!("scripts: {e}")))?,
            None => ScriptsConfig::default(),
        };

        info!(
            "Config OK: system={}, {} controls, {} displays",
            system.id,
            controls.len(),
            displays.len()
        );

        Ok(Self {
            system,
            controls,
            displays,
            scripts,
            sensors: raw.sensors,
            base_dir,
        })
    }

    /// Pretty JSON of the effective configuration (secrets redacted).
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn filter_controls(values: Vec<Value>) -> Vec<ControlConfig> {
    let mut ids = HashSet::new();
    let mut controls = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        let control: ControlConfig = match serde_json::from_value(value) {
            Ok(c) => c,
            Err(e) => {
                error!("CRITICAL: dropping controls[{idx}]: {e}");
                continue;
            }
        };
        if control.disable {
            info!("Control '{}' disabled in config, skipping", control.id);
            continue;
        }
        if let Err(e) = control.validate() {
            error!("CRITICAL: dropping control '{}': {e}", control.id);
            continue;
        }
        if !ids.insert(control.id.clone()) {
            error!("CRITICAL: dropping duplicate control id '{}'", control.id);
            continue;
        }
        controls.push(control);
    }
    controls
}

fn filter_displays(values: Vec<Value>) -> Vec<DisplayConfig> {
    let mut ids = HashSet::new();
    let mut displays = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        let entry: DisplayConfig = match serde_json::from_value(value) {
            Ok(d) => d,
            Err(e) => {
                error!("CRITICAL: dropping displays[{idx}]: {e}");
                continue;
            }
        };
        if let Err(e) = entry.validate() {
            error!("CRITICAL: dropping display '{}': {e}", entry.id);
            continue;
        }
        if !ids.insert(entry.id.clone()) {
            error!("CRITICAL: dropping duplicate display id '{}'", entry.id);
            continue;
        }
        displays.push(entry);
    }
    displays
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal() -> Value {
        json!({
            "system": {
                "id": "lab",
                "mqtt": { "broker": "localhost" }
            },
            "controls": []
        })
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let parse = |s: &str| {
            serde_json::from_str::<Wrapper>(&format!("{{\"level\": \"{s}\"}}"))
                .unwrap()
                .level
        };
        assert_eq!(parse("debug"), LogLevel::Debug);
        assert_eq!(parse("warning"), LogLevel::Warning);
        assert_eq!(parse("critical"), LogLevel::Critical);
        assert_eq!(LogLevel::Critical.as_tracing(), tracing::Level::ERROR);
    }

    #[test]
    fn test_system_defaults() {
        let cfg = BrickConfig::from_value(minimal(), PathBuf::from(".")).unwrap();
        assert_eq!(cfg.system.mqtt.port, 1883);
        assert!(!cfg.system.mqtt.log);
        assert_eq!(cfg.system.interface, "wlan0");
        assert_eq!(cfg.system.publish_time, 15);
        assert_eq!(cfg.system.friendly_name(), "lab");
        assert!(cfg.system.ha.is_none());
        assert!(cfg.displays.is_empty());
    }

    #[test]
    fn test_missing_system_is_fatal() {
        let result = BrickConfig::from_value(json!({ "controls": [] }), PathBuf::new());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_missing_controls_is_fatal() {
        let mut v = minimal();
        v.as_object_mut().unwrap().remove("controls");
        let result = BrickConfig::from_value(v, PathBuf::new());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_system_id_with_space_rejected() {
        let mut v = minimal();
        v["system"]["id"] = json!("my lab");
        assert!(BrickConfig::from_value(v, PathBuf::new()).is_err());
    }

    #[test]
    fn test_netoff_requires_neton() {
        let mut v = minimal();
        v["system"]["indicators"] = json!({ "netoff": 6 });
        assert!(BrickConfig::from_value(v, PathBuf::new()).is_err());
    }

    #[test]
    fn test_malformed_control_dropped_others_survive() {
        let mut v = minimal();
        v["controls"] = json!([
            { "id": "lamp", "pins": 5 },
            { "id": "broken" },
            { "id": "spaced out", "pins": 6 },
            { "id": "off", "pins": 7, "disable": true },
            { "id": "lamp", "pins": 8 },
            { "id": "beacon", "type": "flasher", "pins": [12, 13, 16] }
        ]);
        let cfg = BrickConfig::from_value(v, PathBuf::new()).unwrap();
        let ids: Vec<&str> = cfg.controls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["lamp", "beacon"]);
    }

    #[test]
    fn test_malformed_display_dropped_others_survive() {
        let mut v = minimal();
        v["displays"] = json!([
            { "id": "met", "type": "seg7x4", "address": "0x70" },
            { "id": "alt", "type": "seg7x4", "address": "0xzz" },
            { "id": "vel", "type": "hologram", "address": "0x71" },
            { "id": "met", "type": "bigseg7x4", "address": "0x72" },
            { "id": "clock", "type": "bigseg7x4", "address": "0x73" }
        ]);
        let cfg = BrickConfig::from_value(v, PathBuf::new()).unwrap();
        let ids: Vec<&str> = cfg.displays.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["met", "clock"]);
    }

    #[test]
    fn test_dump_redacts_key() {
        let mut v = minimal();
        v["system"]["mqtt"]["key"] = json!("hunter2");
        let cfg = BrickConfig::from_value(v, PathBuf::new()).unwrap();
        let dumped = cfg.to_json_pretty();
        assert!(!dumped.contains("hunter2"));
        assert!(dumped.contains("********"));
    }

    #[test]
    fn test_load_file_not_found() {
        let result = BrickConfig::load(Path::new("/nonexistent/brickmaster.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();
        let result = BrickConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_script_paths_scan_and_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir(&scripts).unwrap();
        std::fs::write(scripts.join("b.json"), "{}").unwrap();
        std::fs::write(scripts.join("a.json"), "{}").unwrap();
        std::fs::write(scripts.join("notes.txt"), "").unwrap();

        let cfg = ScriptsConfig {
            scan_dir: true,
            dir: Some(PathBuf::from("scripts")),
            files: vec![PathBuf::from("a.json"), PathBuf::from("/abs/c.json")],
        };
        let paths = cfg.script_paths(dir.path());
        assert_eq!(
            paths,
            vec![
                scripts.join("a.json"),
                scripts.join("b.json"),
                PathBuf::from("/abs/c.json"),
            ]
        );
    }
}
