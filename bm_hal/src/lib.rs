//! # BrickMaster HAL Library
//!
//! Hardware abstraction with a pluggable driver architecture.
//!
//! Drivers implement the `GpioDriver` trait defined in
//! `bm_common::hal::driver`; controls never touch a driver directly but
//! go through a [`PinHandle`].
//!
//! # Module Structure
//!
//! - [`pin`] - Logical on/off output over a single line or split pair
//! - [`pin_map`] - Pin-name table (config string → physical line)
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (`simulation`, `sysfs`)
//! - [`platform`] - System id, board id and memory probes
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          bm_hal                              │
//! │  ┌────────────┐    ┌──────────────┐    ┌──────────────────┐  │
//! │  │  PinMap    │───►│  PinHandle   │◄───│ Driver Registry  │  │
//! │  │ (names)    │    │ (single/split)│    │                  │  │
//! │  └────────────┘    └──────┬───────┘    └──────────────────┘  │
//! │                           │                                  │
//! │                           ▼                                  │
//! │                  ┌────────────────┐                          │
//! │                  │  GpioDriver    │ (trait object)           │
//! │                  └────────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod pin;
pub mod pin_map;
pub mod platform;

// Re-export key types for convenience
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimBoard, SimulationDriver};
pub use crate::pin::{PinHandle, PinMode, PinRequest};
pub use crate::pin_map::PinMap;
pub use crate::platform::{FixedPlatform, LinuxPlatform};
