//! # BrickMaster Control Unit Library
//!
//! Runtime of one BrickMaster node: named outputs driven over MQTT,
//! 7-segment displays, timed scripts and the single-threaded loop tying
//! them to the broker.
//!
//! ## Module Structure
//!
//! - [`control`] - Single, flasher and null controls
//! - [`display`] - 4-digit display wrapper and idle views
//! - [`script`] - Script engine, flight compiler, selector router
//! - [`cycle`] - Assembly and the main loop
//! - [`config`] - Config sources and script loading
//! - [`pidfile`] / [`signals`] - Process plumbing for the binary
//!
//! ## Loop Order
//!
//! ```text
//!   adapter.poll ─► control/script/syscmd callbacks ─► flasher ticks
//!        ─► script execute | idle views ─► status pins ─► adapter.flush
//! ```

pub mod config;
pub mod control;
pub mod cycle;
pub mod display;
pub mod error;
pub mod pidfile;
pub mod script;
pub mod signals;

pub use crate::cycle::{CycleRunner, ExitReason, RunnerDeps};
pub use crate::error::CoreError;
