//! Pin claim registry.
//!
//! Built while controls are assembled. Every physical line may be owned
//! by exactly one control; a second claim on the same `PinId` is rejected.
//! The final table is published once on first connect as `system/pins`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::hal::driver::HalError;
use crate::hal::types::PinId;

/// One claimed line and its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinClaim {
    /// Physical line.
    pub pin: String,
    /// Owning control id.
    pub owner: String,
}

/// Registry of claimed physical lines.
#[derive(Debug, Clone, Default)]
pub struct PinClaims {
    claims: BTreeMap<PinId, String>,
}

impl PinClaims {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `pin` for `owner`.
    ///
    /// # Errors
    /// Returns `HalError::DuplicatePin` if another owner already holds it.
    pub fn claim(&mut self, pin: PinId, owner: &str) -> Result<(), HalError> {
        if let Some(first) = self.claims.get(&pin) {
            return Err(HalError::DuplicatePin {
                pin: pin.to_string(),
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.claims.insert(pin, owner.to_string());
        Ok(())
    }

    /// Claim every pin of one control, all or nothing.
    pub fn claim_all(&mut self, pins: &[PinId], owner: &str) -> Result<(), HalError> {
        for (idx, pin) in pins.iter().enumerate() {
            if let Some(first) = self.claims.get(pin) {
                return Err(HalError::DuplicatePin {
                    pin: pin.to_string(),
                    first: first.clone(),
                    second: owner.to_string(),
                });
            }
            if pins[..idx].contains(pin) {
                return Err(HalError::DuplicatePin {
                    pin: pin.to_string(),
                    first: owner.to_string(),
                    second: owner.to_string(),
                });
            }
        }
        for pin in pins {
            self.claims.insert(*pin, owner.to_string());
        }
        Ok(())
    }

    /// Release every pin held by `owner`.
    pub fn release(&mut self, owner: &str) {
        self.claims.retain(|_, o| o != owner);
    }

    /// Whether `pin` is claimed.
    pub fn is_claimed(&self, pin: &PinId) -> bool {
        self.claims.contains_key(pin)
    }

    /// Number of claimed lines.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True if nothing is claimed.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Claimed lines in pin order.
    pub fn entries(&self) -> Vec<PinClaim> {
        self.claims
            .iter()
            .map(|(pin, owner)| PinClaim {
                pin: pin.to_string(),
                owner: owner.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::types::PinSource;

    fn onboard(line: u16) -> PinId {
        PinId::new(PinSource::OnBoard, line)
    }

    #[test]
    fn claim_and_duplicate() {
        let mut claims = PinClaims::new();
        claims.claim(onboard(5), "lamp").unwrap();
        let err = claims.claim(onboard(5), "beacon").unwrap_err();
        assert!(matches!(err, HalError::DuplicatePin { .. }));
        assert!(err.to_string().contains("lamp"));
    }

    #[test]
    fn same_line_on_expander_is_distinct() {
        let mut claims = PinClaims::new();
        claims.claim(onboard(5), "lamp").unwrap();
        claims
            .claim(PinId::new(PinSource::Expander { address: 0x20 }, 5), "relay")
            .unwrap();
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn claim_all_is_atomic() {
        let mut claims = PinClaims::new();
        claims.claim(onboard(7), "lamp").unwrap();
        let err = claims.claim_all(&[onboard(6), onboard(7)], "beacon");
        assert!(err.is_err());
        assert!(!claims.is_claimed(&onboard(6)));
    }

    #[test]
    fn claim_all_rejects_repeat_within_owner() {
        let mut claims = PinClaims::new();
        assert!(claims.claim_all(&[onboard(1), onboard(1)], "beacon").is_err());
        assert!(claims.is_empty());
    }

    #[test]
    fn release_and_entries() {
        let mut claims = PinClaims::new();
        claims.claim_all(&[onboard(2), onboard(1)], "beacon").unwrap();
        claims.claim(onboard(9), "lamp").unwrap();
        claims.release("beacon");
        let entries = claims.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].owner, "lamp");
        assert_eq!(entries[0].pin, "GPIO9");
    }
}
