//! Pin handle.
//!
//! A `PinHandle` is one logical on/off output. It wraps either a single
//! line or a latching split pair (`on` line + `off` line), applies
//! active-low inversion, and for split pairs enforces that the two lines
//! are always in complementary physical states.

use bm_common::hal::driver::{GpioDriver, HalError, OutputLine};
use bm_common::hal::types::PinId;
use bm_common::io::config::PinRef;
use bm_common::io::registry::PinClaims;
use tracing::{debug, error, warn};

use crate::pin_map::PinMap;

/// Single line or split pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// One line.
    Single,
    /// Latching pair.
    Split,
}

enum Lines {
    Single(Box<dyn OutputLine>),
    Split {
        on: Box<dyn OutputLine>,
        off: Box<dyn OutputLine>,
    },
}

/// One logical output owned by exactly one control.
pub struct PinHandle {
    lines: Lines,
    active_low: bool,
}

impl std::fmt::Debug for PinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinHandle")
            .field("mode", &self.mode())
            .field("pins", &self.pins())
            .field("active_low", &self.active_low)
            .finish()
    }
}

/// What to claim and on whose behalf.
#[derive(Debug, Clone, Copy)]
pub struct PinRequest<'a> {
    /// Config pin reference.
    pub pin: &'a PinRef,
    /// Expander address, if the pins live on one.
    pub expander: Option<u8>,
    /// Invert logic.
    pub active_low: bool,
    /// Owning control id.
    pub owner: &'a str,
}

impl PinHandle {
    /// Resolve, claim and open the line(s) of `request`, then drive off.
    ///
    /// # Errors
    /// - `HalError::InvalidPin` if a name does not resolve
    /// - `HalError::DuplicatePin` if another control owns a line
    /// - any driver error while claiming
    pub fn claim(
        driver: &mut dyn GpioDriver,
        map: &PinMap,
        claims: &mut PinClaims,
        request: PinRequest<'_>,
    ) -> Result<Self, HalError> {
        let ids = request
            .pin
            .names()
            .into_iter()
            .map(|name| map.resolve(name, request.expander))
            .collect::<Result<Vec<_>, _>>()?;
        claims.claim_all(&ids, request.owner)?;

        let opened = match (request.pin, ids.as_slice()) {
            (PinRef::Single(_), [id]) => driver.claim_output(*id).map(Lines::Single),
            (PinRef::Split { .. }, [on, off]) => driver.claim_output(*on).and_then(|on| {
                driver
                    .claim_output(*off)
                    .map(|off| Lines::Split { on, off })
            }),
            _ => Err(HalError::ConfigError(format!(
                "'{}': malformed pin reference",
                request.owner
            ))),
        };
        let lines = match opened {
            Ok(lines) => lines,
            Err(e) => {
                claims.release(request.owner);
                return Err(e);
            }
        };

        let mut handle = Self {
            lines,
            active_low: request.active_low,
        };
        if let Err(e) = handle.set_value(false) {
            claims.release(request.owner);
            return Err(e);
        }
        debug!("Pin handle for '{}' on {:?}", request.owner, handle.pins());
        Ok(handle)
    }

    /// Build from already opened lines.
    pub fn single(line: Box<dyn OutputLine>, active_low: bool) -> Self {
        Self {
            lines: Lines::Single(line),
            active_low,
        }
    }

    /// Build a split pair from already opened lines.
    pub fn split(on: Box<dyn OutputLine>, off: Box<dyn OutputLine>, active_low: bool) -> Self {
        Self {
            lines: Lines::Split { on, off },
            active_low,
        }
    }

    /// Single or split.
    pub fn mode(&self) -> PinMode {
        match self.lines {
            Lines::Single(_) => PinMode::Single,
            Lines::Split { .. } => PinMode::Split,
        }
    }

    /// Underlying physical lines.
    pub fn pins(&self) -> Vec<PinId> {
        match &self.lines {
            Lines::Single(line) => vec![line.id()],
            Lines::Split { on, off } => vec![on.id(), off.id()],
        }
    }

    /// Logical state, `true` = on.
    ///
    /// # Errors
    /// `HalError::SplitMismatch` if a split pair is not complementary.
    pub fn value(&self) -> Result<bool, HalError> {
        match &self.lines {
            Lines::Single(line) => Ok(line.read()? != self.active_low),
            Lines::Split { on, off } => {
                let (on_level, off_level) = (on.read()?, off.read()?);
                if on_level == off_level {
                    return Err(HalError::SplitMismatch {
                        on: on.id().to_string(),
                        off: off.id().to_string(),
                    });
                }
                Ok(on_level != self.active_low)
            }
        }
    }

    /// Drive the logical state.
    pub fn set_value(&mut self, value: bool) -> Result<(), HalError> {
        let level = value != self.active_low;
        match &mut self.lines {
            Lines::Single(line) => line.write(level),
            Lines::Split { on, off } => {
                let previous = on.read()?;
                on.write(level)?;
                if let Err(e) = off.write(!level) {
                    warn!("Split pin {} write failed, reverting {}", off.id(), on.id());
                    if let Err(revert) = on.write(previous) {
                        error!(
                            "CRITICAL: split pin {} could not be reverted, pair may be inconsistent: {revert}",
                            on.id()
                        );
                    }
                    return Err(e);
                }
                Ok(())
            }
        }
    }
}
