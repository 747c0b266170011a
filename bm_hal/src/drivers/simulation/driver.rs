//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `GpioDriver` trait on top of a
//! [`SimBoard`]: lines are booleans, displays are strings. Expander pins
//! and displays require the I²C bus to be enabled at `init`, as on
//! real hardware.

use bm_common::hal::driver::{GpioDriver, HalError, OutputLine, SegmentDriver};
use bm_common::hal::types::{DisplayKind, PinId, PinSource};
use tracing::{debug, info};

use super::board::SimBoard;
use super::display::SimSegment;

/// Simulation driver implementing the `GpioDriver` trait.
pub struct SimulationDriver {
    board: SimBoard,
    initialized: bool,
    i2c: bool,
}

impl SimulationDriver {
    /// Driver on a fresh board.
    pub fn new() -> Self {
        Self::with_board(SimBoard::new())
    }

    /// Driver on a shared board.
    pub fn with_board(board: SimBoard) -> Self {
        Self {
            board,
            initialized: false,
            i2c: false,
        }
    }

    /// The board this driver writes to.
    pub fn board(&self) -> SimBoard {
        self.board.clone()
    }

    fn require_init(&self) -> Result<(), HalError> {
        if self.initialized {
            Ok(())
        } else {
            Err(HalError::InitFailed("simulation driver not initialized".into()))
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

struct SimLine {
    id: PinId,
    board: SimBoard,
}

impl OutputLine for SimLine {
    fn id(&self) -> PinId {
        self.id
    }

    fn write(&mut self, high: bool) -> Result<(), HalError> {
        let mut state = self.board.state.lock();
        if state.failing.contains(&self.id) {
            return Err(HalError::CommunicationError(format!("write to {} failed", self.id)));
        }
        state.lines.insert(self.id, high);
        Ok(())
    }

    fn read(&self) -> Result<bool, HalError> {
        Ok(self
            .board
            .state
            .lock()
            .lines
            .get(&self.id)
            .copied()
            .unwrap_or(false))
    }
}

impl GpioDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, i2c: bool) -> Result<(), HalError> {
        self.initialized = true;
        self.i2c = i2c;
        info!("Simulation driver initialized (i2c={i2c})");
        Ok(())
    }

    fn claim_output(&mut self, pin: PinId) -> Result<Box<dyn OutputLine>, HalError> {
        self.require_init()?;
        if matches!(pin.source, PinSource::Expander { .. }) && !self.i2c {
            return Err(HalError::Unsupported(format!(
                "expander pin {pin} without I2C bus"
            )));
        }
        let mut state = self.board.state.lock();
        if !state.claimed.insert(pin) {
            return Err(HalError::InvalidPin(format!("{pin} already open")));
        }
        state.lines.insert(pin, false);
        debug!("sim claim {pin}");
        Ok(Box::new(SimLine {
            id: pin,
            board: self.board.clone(),
        }))
    }

    fn open_display(
        &mut self,
        kind: DisplayKind,
        address: u8,
    ) -> Result<Box<dyn SegmentDriver>, HalError> {
        self.require_init()?;
        if !self.i2c {
            return Err(HalError::Unsupported(format!(
                "display 0x{address:02x} without I2C bus"
            )));
        }
        if !self.board.state.lock().open_displays.insert(address) {
            return Err(HalError::ConfigError(format!(
                "display 0x{address:02x} already open"
            )));
        }
        Ok(Box::new(SimSegment::new(address, kind, self.board.clone())))
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        let mut state = self.board.state.lock();
        state.claimed.clear();
        state.open_displays.clear();
        self.initialized = false;
        info!("Simulation driver shut down");
        Ok(())
    }
}
