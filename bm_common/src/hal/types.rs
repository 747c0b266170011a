//! HAL identifier types.
//!
//! - `PinId` / `PinSource` - a resolved physical output line
//! - `DisplayKind` - supported 4-digit 7-segment variants
//! - `Indicators` - punctuation segments outside the four digits

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a line physically lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PinSource {
    /// Board GPIO header.
    OnBoard,
    /// GPIO expander on the I²C bus.
    Expander {
        /// 7-bit I²C address.
        address: u8,
    },
}

/// A resolved physical output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinId {
    /// Line host.
    pub source: PinSource,
    /// Line number on that host.
    pub line: u16,
}

impl PinId {
    /// Create a pin id.
    pub const fn new(source: PinSource, line: u16) -> Self {
        Self { source, line }
    }

    /// On-board line shorthand.
    pub const fn onboard(line: u16) -> Self {
        Self::new(PinSource::OnBoard, line)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            PinSource::OnBoard => write!(f, "GPIO{}", self.line),
            PinSource::Expander { address } => write!(f, "0x{address:02x}:{}", self.line),
        }
    }
}

/// Supported 7-segment display variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayKind {
    /// Small 4-digit backpack with a center colon.
    #[serde(rename = "seg7x4")]
    Seg7x4,
    /// Large 4-digit backpack with colon and am/pm indicator.
    #[serde(rename = "bigseg7x4")]
    BigSeg7x4,
}

impl DisplayKind {
    /// Whether the variant has an am/pm indicator.
    pub const fn has_ampm(self) -> bool {
        matches!(self, Self::BigSeg7x4)
    }
}

bitflags! {
    /// Punctuation segments outside the four digits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Indicators: u8 {
        /// Center colon.
        const COLON = 0x01;
        /// Am/pm dot (big variant only).
        const AMPM  = 0x02;
        /// Every decimal point.
        const DOTS  = 0x04;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_id_display() {
        assert_eq!(PinId::onboard(17).to_string(), "GPIO17");
        let exp = PinId::new(PinSource::Expander { address: 0x20 }, 3);
        assert_eq!(exp.to_string(), "0x20:3");
    }

    #[test]
    fn display_kind_serde_names() {
        let k: DisplayKind = serde_json::from_str("\"bigseg7x4\"").unwrap();
        assert_eq!(k, DisplayKind::BigSeg7x4);
        assert!(k.has_ampm());
        assert!(!DisplayKind::Seg7x4.has_ampm());
    }

    #[test]
    fn indicators_default_empty() {
        assert!(Indicators::default().is_empty());
        let both = Indicators::COLON | Indicators::DOTS;
        assert!(both.contains(Indicators::COLON));
        assert!(!both.contains(Indicators::AMPM));
    }
}
