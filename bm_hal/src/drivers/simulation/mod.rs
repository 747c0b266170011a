//! Simulation driver module.
//!
//! Software board for development and testing without physical hardware.

mod board;
mod display;
mod driver;

pub use board::{SimBoard, SimDisplayState};
pub use display::SimSegment;
pub use driver::SimulationDriver;

use bm_common::hal::driver::GpioDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn GpioDriver> {
    Box::new(SimulationDriver::new())
}
