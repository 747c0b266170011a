//! Flasher: lights one pin of a list at a time, with dwell and gap.
//!
//! Both thresholds are measured from one timestamp:
//!
//! ```text
//!   last_transition        + loiter           + loiter + switch
//!        │ pin[k] lit          │  all dark           │ pin[k+1] lit, restamp
//! ───────┴─────────────────────┴─────────────────────┴──────────►
//! ```

use bm_common::hal::driver::HalError;
use bm_hal::PinHandle;
use std::time::Duration;
use tracing::debug;

use super::{ControlInfo, ControlStatus};

/// Rotating output over a non-empty list of pin handles.
#[derive(Debug)]
pub struct FlasherControl {
    info: ControlInfo,
    pins: Vec<PinHandle>,
    loiter: Duration,
    switch: Duration,
    running: bool,
    position: usize,
    lit: bool,
    last_transition: Duration,
}

impl FlasherControl {
    /// Build from claimed handles.
    ///
    /// # Errors
    /// `HalError::ConfigError` when `pins` is empty.
    pub fn new(
        info: ControlInfo,
        pins: Vec<PinHandle>,
        loiter_ms: u64,
        switch_ms: u64,
    ) -> Result<Self, HalError> {
        if pins.is_empty() {
            return Err(HalError::ConfigError(format!(
                "flasher '{}' has no pins",
                info.id
            )));
        }
        Ok(Self {
            info,
            pins,
            loiter: Duration::from_millis(loiter_ms),
            switch: Duration::from_millis(switch_ms),
            running: false,
            position: 0,
            lit: false,
            last_transition: Duration::ZERO,
        })
    }

    /// Identity.
    pub fn info(&self) -> &ControlInfo {
        &self.info
    }

    /// `ON` while running.
    pub fn status(&self) -> ControlStatus {
        if self.running {
            ControlStatus::On
        } else {
            ControlStatus::Off
        }
    }

    /// Whether the rotation is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Index of the current element.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Dwell with the element lit [ms].
    pub fn loiter_ms(&self) -> u64 {
        self.loiter.as_millis() as u64
    }

    /// Dark gap before the next element [ms].
    pub fn switch_ms(&self) -> u64 {
        self.switch.as_millis() as u64
    }

    /// Number of pins in the rotation.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Never true; a flasher has at least one pin.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Start from position 0, or stop with every pin dark.
    ///
    /// `on` while already running changes nothing.
    pub fn set(&mut self, on: bool, now: Duration) -> Result<(), HalError> {
        if on {
            if self.running {
                return Ok(());
            }
            self.all_off()?;
            self.running = true;
            self.position = 0;
            self.energize(now)?;
            debug!("flasher '{}' started", self.info.id);
        } else {
            let was_running = std::mem::replace(&mut self.running, false);
            self.all_off()?;
            self.lit = false;
            if was_running {
                debug!("flasher '{}' stopped", self.info.id);
            }
        }
        Ok(())
    }

    /// Apply the two thresholds for `now`.
    pub fn tick(&mut self, now: Duration) -> Result<(), HalError> {
        if !self.running {
            return Ok(());
        }
        let elapsed = now.saturating_sub(self.last_transition);
        if elapsed > self.loiter && self.lit {
            self.pins[self.position].set_value(false)?;
            self.lit = false;
        }
        if elapsed > self.loiter + self.switch {
            self.position = (self.position + 1) % self.pins.len();
            self.energize(now)?;
        }
        Ok(())
    }

    fn energize(&mut self, now: Duration) -> Result<(), HalError> {
        self.pins[self.position].set_value(true)?;
        self.lit = true;
        self.last_transition = now;
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), HalError> {
        for pin in &mut self.pins {
            pin.set_value(false)?;
        }
        Ok(())
    }

    /// Logical levels of every pin, in order.
    pub fn levels(&self) -> Result<Vec<bool>, HalError> {
        self.pins.iter().map(PinHandle::value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_common::hal::driver::OutputLine;
    use bm_common::hal::types::PinId;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Line(PinId, Rc<Cell<bool>>);

    impl OutputLine for Line {
        fn id(&self) -> PinId {
            self.0
        }
        fn write(&mut self, high: bool) -> Result<(), HalError> {
            self.1.set(high);
            Ok(())
        }
        fn read(&self) -> Result<bool, HalError> {
            Ok(self.1.get())
        }
    }

    fn flasher(n: u16, loiter: u64, switch: u64) -> (FlasherControl, Vec<Rc<Cell<bool>>>) {
        let levels: Vec<_> = (0..n).map(|_| Rc::new(Cell::new(false))).collect();
        let pins = levels
            .iter()
            .enumerate()
            .map(|(i, l)| PinHandle::single(Box::new(Line(PinId::onboard(i as u16), l.clone())), false))
            .collect();
        let info = ControlInfo {
            id: "beacon".into(),
            name: "Beacon".into(),
            icon: String::new(),
            publish_time: 15,
        };
        (FlasherControl::new(info, pins, loiter, switch).unwrap(), levels)
    }

    fn lit(levels: &[Rc<Cell<bool>>]) -> Vec<usize> {
        levels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.get())
            .map(|(i, _)| i)
            .collect()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_list_rejected() {
        let info = ControlInfo {
            id: "x".into(),
            name: "x".into(),
            icon: String::new(),
            publish_time: 0,
        };
        assert!(FlasherControl::new(info, Vec::new(), 1000, 0).is_err());
    }

    #[test]
    fn zero_gap_keeps_exactly_one_lit() {
        let (mut f, levels) = flasher(3, 100, 0);
        f.set(true, ms(0)).unwrap();
        let mut t = 0;
        while t < 1000 {
            f.tick(ms(t)).unwrap();
            assert_eq!(lit(&levels).len(), 1, "at {t} ms");
            t += 7;
        }
    }

    #[test]
    fn restart_from_zero_after_off() {
        let (mut f, levels) = flasher(3, 100, 0);
        f.set(true, ms(0)).unwrap();
        f.tick(ms(101)).unwrap();
        assert_eq!(f.position(), 1);
        f.set(false, ms(150)).unwrap();
        assert!(lit(&levels).is_empty());
        assert_eq!(f.status(), ControlStatus::Off);
        f.set(true, ms(200)).unwrap();
        assert_eq!(f.position(), 0);
        assert_eq!(lit(&levels), vec![0]);
    }

    #[test]
    fn on_while_running_does_not_reset() {
        let (mut f, _) = flasher(2, 100, 0);
        f.set(true, ms(0)).unwrap();
        f.tick(ms(101)).unwrap();
        f.set(true, ms(120)).unwrap();
        assert_eq!(f.position(), 1);
    }

    #[test]
    fn idle_tick_is_noop() {
        let (mut f, levels) = flasher(2, 100, 0);
        f.tick(ms(5000)).unwrap();
        assert!(lit(&levels).is_empty());
        assert_eq!(f.levels().unwrap(), vec![false, false]);
    }
}
