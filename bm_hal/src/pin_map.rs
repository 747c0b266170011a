//! Pin-name table.
//!
//! Config files name pins loosely: `5`, `"D5"`, `"GPIO5"` on the board,
//! `"0"`–`"15"` or `"A0"`–`"B7"` on an MCP23017-style expander. The table
//! turns those strings into a [`PinId`] once, at construction time.

use bm_common::hal::driver::HalError;
use bm_common::hal::types::{PinId, PinSource};
use bm_common::io::config::PinName;

/// Lines per expander bank (`A` / `B`).
const EXPANDER_BANK_LINES: u16 = 8;

/// Resolves pin names for one board layout.
#[derive(Debug, Clone, Copy)]
pub struct PinMap {
    onboard_lines: u16,
    expander_lines: u16,
}

impl PinMap {
    /// Board with `onboard_lines` GPIO lines and 16-line expanders.
    pub const fn new(onboard_lines: u16) -> Self {
        Self {
            onboard_lines,
            expander_lines: 2 * EXPANDER_BANK_LINES,
        }
    }

    /// Raspberry Pi 40-pin header, BCM numbering `0..=27`.
    pub const fn raspberry_pi() -> Self {
        Self::new(28)
    }

    /// Resolve a name. `expander` is the I²C address from `extio`.
    ///
    /// # Errors
    /// Returns `HalError::InvalidPin` for names outside the table.
    pub fn resolve(&self, name: &PinName, expander: Option<u8>) -> Result<PinId, HalError> {
        let text = name.as_str().trim();
        let invalid = || HalError::InvalidPin(format!("'{text}'"));
        match expander {
            None => {
                let upper = text.to_ascii_uppercase();
                let digits = upper
                    .strip_prefix("GPIO")
                    .or_else(|| upper.strip_prefix('D'))
                    .unwrap_or(&upper);
                let line: u16 = digits.parse().map_err(|_| invalid())?;
                if line >= self.onboard_lines {
                    return Err(invalid());
                }
                Ok(PinId::onboard(line))
            }
            Some(address) => {
                let upper = text.to_ascii_uppercase();
                let line = match upper.as_bytes() {
                    [bank @ (b'A' | b'B'), rest @ ..] => {
                        let idx: u16 = std::str::from_utf8(rest)
                            .map_err(|_| invalid())?
                            .parse()
                            .map_err(|_| invalid())?;
                        if idx >= EXPANDER_BANK_LINES {
                            return Err(invalid());
                        }
                        idx + if *bank == b'B' { EXPANDER_BANK_LINES } else { 0 }
                    }
                    _ => upper.parse().map_err(|_| invalid())?,
                };
                if line >= self.expander_lines {
                    return Err(invalid());
                }
                Ok(PinId::new(PinSource::Expander { address }, line))
            }
        }
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::raspberry_pi()
    }
}
