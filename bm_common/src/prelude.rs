//! Prelude module for common re-exports.
//!
//! `use bm_common::prelude::*;` brings in the types nearly every crate
//! of the workspace touches.
//!
//! # Usage
//!
//! ```rust
//! use bm_common::prelude::*;
//! let clock = ManualClock::new();
//! assert_eq!(clock.now().as_secs(), 0);
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{BrickConfig, ConfigError, ConfigLoader, SystemConfig};
pub use crate::hal::config::{DisplayConfig, IdleMode};
pub use crate::io::config::{ControlConfig, ControlType, PinName, PinRef};
pub use crate::script::ScriptFile;

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::driver::{GpioDriver, HalError, OutputLine, SegmentDriver};
pub use crate::hal::types::{DisplayKind, Indicators, PinId, PinSource};

// ─── Platform ───────────────────────────────────────────────────────
pub use crate::platform::{Clock, ManualClock, MemInfo, Platform, SystemClock};

// ─── Formatting ─────────────────────────────────────────────────────
pub use crate::format::{Seg7Text, UnitSystem, number_7s, time_7s};
