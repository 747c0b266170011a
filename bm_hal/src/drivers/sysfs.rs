//! Linux sysfs GPIO driver.
//!
//! Drives on-board lines through `/sys/class/gpio`: `export`, then
//! `gpioN/direction = out`, then `gpioN/value`. Expander pins and
//! displays need an I²C backend this driver does not provide; requests
//! for them fail construction with `HalError::Unsupported`.

use bm_common::hal::driver::{GpioDriver, HalError, OutputLine, SegmentDriver};
use bm_common::hal::types::{DisplayKind, PinId, PinSource};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// The kernel creates `gpioN/` asynchronously after `export`.
const EXPORT_SETTLE: Duration = Duration::from_millis(50);
const EXPORT_RETRIES: u32 = 10;

fn io_err(path: &Path, e: std::io::Error) -> HalError {
    HalError::CommunicationError(format!("{}: {e}", path.display()))
}

/// sysfs GPIO driver.
pub struct SysfsDriver {
    root: PathBuf,
    exported: Vec<u16>,
    initialized: bool,
}

impl SysfsDriver {
    /// Driver on the system GPIO root.
    pub fn new() -> Self {
        Self::with_root(SYSFS_GPIO_ROOT)
    }

    /// Driver on another root, for tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: Vec::new(),
            initialized: false,
        }
    }

    fn line_dir(&self, line: u16) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    fn export(&mut self, line: u16) -> Result<PathBuf, HalError> {
        let dir = self.line_dir(line);
        if !dir.exists() {
            let export = self.root.join("export");
            fs::write(&export, line.to_string()).map_err(|e| io_err(&export, e))?;
            self.exported.push(line);
            for _ in 0..EXPORT_RETRIES {
                if dir.join("direction").exists() {
                    break;
                }
                thread::sleep(EXPORT_SETTLE);
            }
        }
        let direction = dir.join("direction");
        fs::write(&direction, "out").map_err(|e| io_err(&direction, e))?;
        Ok(dir.join("value"))
    }
}

impl Default for SysfsDriver {
    fn default() -> Self {
        Self::new()
    }
}

struct SysfsLine {
    id: PinId,
    value: PathBuf,
}

impl OutputLine for SysfsLine {
    fn id(&self) -> PinId {
        self.id
    }

    fn write(&mut self, high: bool) -> Result<(), HalError> {
        fs::write(&self.value, if high { "1" } else { "0" }).map_err(|e| io_err(&self.value, e))
    }

    fn read(&self) -> Result<bool, HalError> {
        let text = fs::read_to_string(&self.value).map_err(|e| io_err(&self.value, e))?;
        Ok(text.trim() == "1")
    }
}

impl GpioDriver for SysfsDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, i2c: bool) -> Result<(), HalError> {
        if !self.root.is_dir() {
            return Err(HalError::InitFailed(format!(
                "{} not available",
                self.root.display()
            )));
        }
        if i2c {
            warn!("sysfs driver has no I2C backend; expanders and displays will be rejected");
        }
        self.initialized = true;
        info!("sysfs driver initialized at {}", self.root.display());
        Ok(())
    }

    fn claim_output(&mut self, pin: PinId) -> Result<Box<dyn OutputLine>, HalError> {
        if !self.initialized {
            return Err(HalError::InitFailed("sysfs driver not initialized".into()));
        }
        let PinSource::OnBoard = pin.source else {
            return Err(HalError::Unsupported(format!("expander pin {pin}")));
        };
        let value = self.export(pin.line)?;
        fs::write(&value, "0").map_err(|e| io_err(&value, e))?;
        debug!("sysfs claim {pin}");
        Ok(Box::new(SysfsLine { id: pin, value }))
    }

    fn open_display(
        &mut self,
        _kind: DisplayKind,
        address: u8,
    ) -> Result<Box<dyn SegmentDriver>, HalError> {
        Err(HalError::Unsupported(format!(
            "display 0x{address:02x} on sysfs driver"
        )))
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        let unexport = self.root.join("unexport");
        for line in self.exported.drain(..) {
            if let Err(e) = fs::write(&unexport, line.to_string()) {
                warn!("unexport gpio{line}: {e}");
            }
        }
        self.initialized = false;
        Ok(())
    }
}

/// Factory function to create a sysfs driver instance.
pub fn create_driver() -> Box<dyn GpioDriver> {
    Box::new(SysfsDriver::new())
}
