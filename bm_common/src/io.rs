//! Control I/O configuration.
//!
//! Shared between HAL and control unit. [`config`] holds the per-control
//! schema from the `controls` section; [`registry`] tracks which physical
//! lines are claimed so no two controls drive the same pin.

pub mod config;
pub mod registry;
