//! System-wide constants for the BrickMaster workspace.
//!
//! Single source of truth for timeouts, defaults and topic fragments.
//! Imported by all crates; no duplication permitted.

use static_assertions::const_assert;
use std::time::Duration;

// ─── MQTT timing ────────────────────────────────────────────────────

/// Upper bound on one network poll of the MQTT client.
pub const MQTT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Loop wait while a flasher is running, so dwell and gap stay visible.
pub const FLASHER_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Reconnect backoff step [s]. Also the backoff after a successful connect.
pub const RECONNECT_BACKOFF_STEP_S: u64 = 5;

/// Reconnect backoff ceiling [s].
pub const RECONNECT_BACKOFF_MAX_S: u64 = 120;

/// Window after a discovery burst during which every publish is forced [s].
pub const DISCOVERY_FORCE_WINDOW_S: u64 = 15;

/// MQTT keep-alive interval [s].
pub const MQTT_KEEP_ALIVE_S: u64 = 30;

/// A connection attempt without broker acknowledgement fails after this [s].
pub const MQTT_CONNECT_TIMEOUT_S: u64 = 10;

const_assert!(RECONNECT_BACKOFF_STEP_S > 0);
const_assert!(RECONNECT_BACKOFF_STEP_S <= RECONNECT_BACKOFF_MAX_S);
const_assert!(RECONNECT_BACKOFF_MAX_S % RECONNECT_BACKOFF_STEP_S == 0);
const_assert!(MQTT_CONNECT_TIMEOUT_S < MQTT_KEEP_ALIVE_S);

// ─── Config defaults ────────────────────────────────────────────────

/// Default MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default network interface used to derive the system id.
pub const DEFAULT_INTERFACE: &str = "wlan0";

/// Default interval between memory telemetry samples [s].
pub const DEFAULT_PUBLISH_TIME_S: u64 = 15;

/// Default Home Assistant discovery prefix.
pub const DEFAULT_HA_BASE: &str = "homeassistant";

/// Default control icon.
pub const DEFAULT_ICON: &str = "mdi:toy-brick";

/// Default flasher dwell with an element lit [ms].
pub const DEFAULT_LOITER_MS: u64 = 1000;

/// Default flasher dark gap between elements [ms].
pub const DEFAULT_SWITCH_MS: u64 = 0;

/// Default display brightness (0.0–1.0).
pub const DEFAULT_BRIGHTNESS: f32 = 1.0;

// ─── Topics & identity ──────────────────────────────────────────────

/// Root of every BrickMaster topic: `<TOPIC_PREFIX>/<system id>/…`.
pub const TOPIC_PREFIX: &str = "brickmaster";

/// Prefix of the discovery node id: `bm2_<system id>`.
pub const DISCOVERY_NODE_PREFIX: &str = "bm2_";

/// Connectivity payload while connected.
pub const PAYLOAD_ONLINE: &str = "online";

/// Connectivity payload published by the last will.
pub const PAYLOAD_OFFLINE: &str = "offline";

/// Script selector option that idles the active script.
pub const SCRIPT_INACTIVE: &str = "Inactive";

/// Script selector option that aborts the active script.
pub const SCRIPT_ABORT: &str = "Abort";

/// Longest script timeline, separators included [s].
pub const MAX_SCRIPT_LENGTH_S: u64 = 7 * 24 * 3600;

/// Device manufacturer reported in discovery.
pub const MANUFACTURER: &str = "ConHugeCo";

/// Device model reported in discovery.
pub const MODEL: &str = "BrickMaster";

// ─── Displays ───────────────────────────────────────────────────────

/// Visible character positions on a 4-digit display.
pub const DISPLAY_WIDTH: usize = 4;

/// Text returned when a value cannot be represented.
pub const TEXT_ERROR: &str = "ERR";

/// Text returned when a number has too many integer digits.
pub const TEXT_TOO_LONG: &str = "E-TL";

/// Name of the PID file written into `--rundir`.
pub const PID_FILE_NAME: &str = "brickmaster.pid";
