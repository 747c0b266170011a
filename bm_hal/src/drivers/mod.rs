//! Driver implementations.
//!
//! - [`simulation`] - In-memory board for development and testing
//! - [`sysfs`] - Linux `/sys/class/gpio` on-board lines
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `GpioDriver` trait from `bm_common::hal::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;
pub mod sysfs;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
    registry.register("sysfs", sysfs::create_driver);
}
