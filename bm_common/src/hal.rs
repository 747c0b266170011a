//! Hardware abstraction types shared by drivers and consumers.
//!
//! This module contains pin and display identifiers, the driver traits
//! every backend implements, and the display section of the config.

pub mod config;
pub mod driver;
pub mod types;
