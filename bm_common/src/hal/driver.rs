//! HAL driver traits and error types.
//!
//! This module defines:
//! - `GpioDriver` trait - Interface for pluggable hardware backends
//! - `OutputLine` trait - One claimed physical output line
//! - `SegmentDriver` trait - One 4-digit 7-segment display
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::types::{DisplayKind, Indicators, PinId};
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver or bus initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pin identifier cannot be resolved on this platform
    #[error("Invalid pin: {0}")]
    InvalidPin(String),

    /// Same physical line claimed twice
    #[error("Pin {pin} already claimed by '{first}', requested by '{second}'")]
    DuplicatePin {
        /// Physical line.
        pin: String,
        /// First owner.
        first: String,
        /// Rejected owner.
        second: String,
    },

    /// Capability not provided by this driver
    #[error("Unsupported by driver: {0}")]
    Unsupported(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Split pin lines observed in a disallowed combination
    #[error("Split pin {on}/{off} lines not complementary")]
    SplitMismatch {
        /// Drive-on line.
        on: String,
        /// Drive-off line.
        off: String,
    },

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn GpioDriver>;

/// One claimed physical output line.
pub trait OutputLine {
    /// The line this handle drives.
    fn id(&self) -> PinId;

    /// Drive the line high (`true`) or low.
    fn write(&mut self, high: bool) -> Result<(), HalError>;

    /// Read back the driven level.
    fn read(&self) -> Result<bool, HalError>;
}

/// One 4-digit 7-segment display.
pub trait SegmentDriver {
    /// Write up to four characters; `.` attaches a decimal point to the
    /// preceding digit and `:` lights the colon.
    fn write_text(&mut self, text: &str) -> Result<(), HalError>;

    /// Set punctuation segments outside the digits.
    fn set_indicators(&mut self, indicators: Indicators) -> Result<(), HalError>;

    /// Set brightness, 0.0–1.0.
    fn set_brightness(&mut self, brightness: f32) -> Result<(), HalError>;

    /// Blank every segment and indicator.
    fn clear(&mut self) -> Result<(), HalError>;
}

/// Trait defining the interface for GPIO/display backends.
///
/// The control unit manages hardware through this trait, enabling
/// pluggable backends (simulation, sysfs, expander boards).
///
/// # Lifecycle
///
/// 1. `init()` - Called once before any claim
/// 2. `claim_output()` / `open_display()` - Called while assembling controls
/// 3. `shutdown()` - Called on every exit path after outputs are driven off
pub trait GpioDriver {
    /// Returns the driver's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver. `i2c` says whether the bus may be opened.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if the bus cannot be set up.
    fn init(&mut self, i2c: bool) -> Result<(), HalError>;

    /// Claim a physical line as an output, initially low.
    fn claim_output(&mut self, pin: PinId) -> Result<Box<dyn OutputLine>, HalError>;

    /// Open a 7-segment display at an I²C address.
    fn open_display(
        &mut self,
        kind: DisplayKind,
        address: u8,
    ) -> Result<Box<dyn SegmentDriver>, HalError>;

    /// Release the bus and any driver resources.
    fn shutdown(&mut self) -> Result<(), HalError>;
}
