//! Named GPIO driver factories.
//!
//! `--driver <name>` (or `--simulate`) selects one entry. The registry is
//! built at startup and passed in, never stored globally.

use bm_common::hal::driver::{DriverFactory, GpioDriver, HalError};
use std::collections::BTreeMap;
use tracing::debug;

/// Driver name to factory, sorted by name.
pub struct DriverRegistry {
    factories: BTreeMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Registry with no drivers.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// `simulation` and `sysfs`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Add a factory under `name`. A second registration under the same
    /// name is ignored and reported.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> bool {
        if self.factories.contains_key(name) {
            debug!("driver '{name}' already registered, keeping the first");
            return false;
        }
        self.factories.insert(name, factory);
        true
    }

    /// Factory for `name`.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Instantiate the driver called `name`.
    ///
    /// # Errors
    /// `HalError::DriverNotFound` naming the known drivers.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn GpioDriver>, HalError> {
        let factory = self.get_factory(name).ok_or_else(|| {
            HalError::DriverNotFound(format!("{name} (known: {})", self.names().join(", ")))
        })?;
        let driver = factory();
        debug!("driver '{}' v{} created", driver.name(), driver.version());
        Ok(driver)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
