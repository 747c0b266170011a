//! Simulated 7-segment backpack.

use bm_common::hal::driver::{HalError, SegmentDriver};
use bm_common::hal::types::{DisplayKind, Indicators};
use tracing::trace;

use super::board::SimBoard;

/// Display writing into a [`SimBoard`].
pub struct SimSegment {
    address: u8,
    kind: DisplayKind,
    board: SimBoard,
}

impl SimSegment {
    pub(crate) fn new(address: u8, kind: DisplayKind, board: SimBoard) -> Self {
        board
            .state
            .lock()
            .displays
            .entry(address)
            .or_default();
        Self {
            address,
            kind,
            board,
        }
    }

    fn update(&self, f: impl FnOnce(&mut super::SimDisplayState)) {
        let mut state = self.board.state.lock();
        if let Some(display) = state.displays.get_mut(&self.address) {
            f(display);
        }
    }
}

impl SegmentDriver for SimSegment {
    fn write_text(&mut self, text: &str) -> Result<(), HalError> {
        let digits = text.chars().filter(|c| !matches!(c, '.' | ':')).count();
        if digits > 4 {
            return Err(HalError::ConfigError(format!("'{text}' exceeds four digits")));
        }
        trace!("sim display 0x{:02x}: '{text}'", self.address);
        self.update(|d| {
            d.text = text.to_string();
            d.writes += 1;
        });
        Ok(())
    }

    fn set_indicators(&mut self, indicators: Indicators) -> Result<(), HalError> {
        if indicators.contains(Indicators::AMPM) && !self.kind.has_ampm() {
            return Err(HalError::Unsupported(format!(
                "am/pm indicator on 0x{:02x}",
                self.address
            )));
        }
        self.update(|d| d.indicators = indicators);
        Ok(())
    }

    fn set_brightness(&mut self, brightness: f32) -> Result<(), HalError> {
        self.update(|d| d.brightness = brightness.clamp(0.0, 1.0));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HalError> {
        self.update(|d| {
            d.text.clear();
            d.indicators = Indicators::empty();
        });
        Ok(())
    }
}
