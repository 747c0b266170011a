//! Shared simulated board state.
//!
//! The driver and every line/display it hands out write into one
//! `SimBoard`. Tests keep a clone and observe pin levels and display
//! contents from outside the runtime.

use bm_common::hal::types::{Indicators, PinId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Observable state of one simulated 7-segment display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimDisplayState {
    /// Last text written, including `.` and `:` marks.
    pub text: String,
    /// Lit indicators.
    pub indicators: Indicators,
    /// Brightness 0.0–1.0.
    pub brightness: f32,
    /// Number of text writes, self-test included.
    pub writes: usize,
}

impl SimDisplayState {
    /// No segment and no indicator lit.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.indicators.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct BoardState {
    pub(crate) lines: BTreeMap<PinId, bool>,
    pub(crate) claimed: BTreeSet<PinId>,
    pub(crate) displays: BTreeMap<u8, SimDisplayState>,
    pub(crate) open_displays: BTreeSet<u8>,
    pub(crate) failing: BTreeSet<PinId>,
}

/// Handle to a simulated board. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    pub(crate) state: Arc<Mutex<BoardState>>,
}

impl SimBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Level of a line, `None` if never claimed.
    pub fn level(&self, pin: PinId) -> Option<bool> {
        self.state.lock().lines.get(&pin).copied()
    }

    /// Level of an on-board line; unclaimed reads low.
    pub fn onboard(&self, line: u16) -> bool {
        self.level(PinId::onboard(line)).unwrap_or(false)
    }

    /// Force a level from outside, as a stuck relay would.
    pub fn force_level(&self, pin: PinId, high: bool) {
        self.state.lock().lines.insert(pin, high);
    }

    /// Make every write to `pin` fail.
    pub fn fail_writes(&self, pin: PinId) {
        self.state.lock().failing.insert(pin);
    }

    /// Every line currently high.
    pub fn high_lines(&self) -> Vec<PinId> {
        self.state
            .lock()
            .lines
            .iter()
            .filter(|(_, high)| **high)
            .map(|(pin, _)| *pin)
            .collect()
    }

    /// Snapshot of the display at `address`.
    pub fn display(&self, address: u8) -> Option<SimDisplayState> {
        self.state.lock().displays.get(&address).cloned()
    }

    /// Number of lines currently claimed.
    pub fn claimed(&self) -> usize {
        self.state.lock().claimed.len()
    }
}
