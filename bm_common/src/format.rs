//! Fixed-width formatting for 4-digit 7-segment displays.
//!
//! Every result occupies exactly four character positions. A decimal
//! point rides on the preceding digit and does not take a position, so
//! `"3.142"` is a valid four-position string. The colon is likewise a
//! separate segment: `"01:15"` fills four positions.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::consts::{DISPLAY_WIDTH, TEXT_ERROR, TEXT_TOO_LONG};

/// Buffer for one display's text, including `.` and `:` marks.
pub type Seg7Text = String<8>;

const KM_TO_MILES: f64 = 0.621_371;

fn text(s: &str) -> Seg7Text {
    let mut out = Seg7Text::new();
    if out.push_str(s).is_err() {
        out.clear();
        // Fits: 4 bytes.
        let _ = out.push_str(TEXT_TOO_LONG);
    }
    out
}

/// Format a signed second count as a 4-position timer.
///
/// | seconds            | output     |
/// |--------------------|------------|
/// | `0..60`            | `00:SS`    |
/// | `60..=5999`        | `MM:SS`    |
/// | `-59..0`           | `- :SS`    |
/// | `-598..=-60`       | `-M:SS`    |
/// | otherwise          | `ERR`      |
pub fn time_7s(seconds: i64) -> Seg7Text {
    if !(-598..=5999).contains(&seconds) {
        return text(TEXT_ERROR);
    }
    let abs = seconds.unsigned_abs();
    let (m, s) = (abs / 60, abs % 60);
    let formatted = if seconds >= 0 {
        format!("{m:02}:{s:02}")
    } else if m == 0 {
        format!("- :{s:02}")
    } else {
        format!("-{m}:{s:02}")
    };
    text(&formatted)
}

fn int_digits(value: f64) -> usize {
    let whole = value.trunc().abs();
    let digits = if whole < 1.0 {
        1
    } else {
        whole.log10().floor() as usize + 1
    };
    digits + usize::from(value.is_sign_negative() && value != 0.0)
}

fn positions(s: &str) -> usize {
    s.chars().filter(|c| *c != '.').count()
}

/// Format a number into `width` positions.
///
/// Integral values are right-justified. Fractional values spend every
/// position left after the integer part on decimals, zero-padded, so the
/// result always fills the field. More integer digits than positions
/// (the sign counts) gives `"E-TL"`.
pub fn number_7s(value: f64, width: usize) -> Seg7Text {
    if !value.is_finite() {
        return text(TEXT_ERROR);
    }
    let digits = int_digits(value);
    if digits > width {
        return text(TEXT_TOO_LONG);
    }
    if value.fract() == 0.0 {
        return text(&format!("{:>width$}", value as i64));
    }
    for places in (0..=width - digits).rev() {
        let candidate = if places == 0 {
            format!("{:>width$}", value.round() as i64)
        } else {
            format!("{:0w$.places$}", value, w = width + 1)
        };
        if positions(&candidate) <= width {
            return text(&candidate);
        }
    }
    text(TEXT_TOO_LONG)
}

/// [`number_7s`] at the standard display width.
pub fn number_7s_default(value: f64) -> Seg7Text {
    number_7s(value, DISPLAY_WIDTH)
}

/// Output unit system for flight values. Internally values are km and km/h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Kilometres, km/h.
    #[default]
    Metric,
    /// Miles, mph.
    Imperial,
}

impl UnitSystem {
    /// Convert a canonical altitude [km].
    pub fn altitude(self, km: f64) -> f64 {
        match self {
            Self::Metric => km,
            Self::Imperial => km * KM_TO_MILES,
        }
    }

    /// Convert a canonical velocity [km/h].
    pub fn velocity(self, kmh: f64) -> f64 {
        match self {
            Self::Metric => kmh,
            Self::Imperial => kmh * KM_TO_MILES,
        }
    }
}

/// Round to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
