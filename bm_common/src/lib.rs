//! BrickMaster Common Library
//!
//! Shared types for every BrickMaster workspace crate: the JSON
//! configuration schema and loader, system constants, the 7-segment
//! formatter, hardware driver traits and the platform interface.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading, `system` section, entity filtering
//! - [`consts`] - Timeouts, defaults and topic fragments
//! - [`format`] - Fixed-width 7-segment formatting
//! - [`hal`] - Pin/display identifiers, driver traits, display config
//! - [`io`] - Control config schema and pin claim registry
//! - [`platform`] - Clock, memory probe and system id traits
//! - [`script`] - Script file schema
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! bm_common = { workspace = true }
//! ```
//!
//! ```rust
//! use bm_common::format::time_7s;
//! assert_eq!(time_7s(75).as_str(), "01:15");
//! ```

pub mod config;
pub mod consts;
pub mod format;
pub mod hal;
pub mod io;
pub mod platform;
pub mod prelude;
pub mod script;
