//! Script selection from the selector topic.

use bm_common::consts::{SCRIPT_ABORT, SCRIPT_INACTIVE};
use bm_common::hal::driver::HalError;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use super::{Script, ScriptStatus};
use crate::control::Controls;
use crate::display::Displays;

/// Owns the loaded scripts and tracks which one is active.
#[derive(Debug, Default)]
pub struct ScriptRouter {
    scripts: BTreeMap<String, Script>,
    active: Option<String>,
}

impl ScriptRouter {
    /// Router over `scripts`. A later script with a duplicate name replaces
    /// the earlier one.
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        let mut map = BTreeMap::new();
        for script in scripts {
            if map.contains_key(script.name()) {
                warn!("duplicate script name '{}', keeping the last", script.name());
            }
            map.insert(script.name().to_string(), script);
        }
        Self {
            scripts: map,
            active: None,
        }
    }

    /// Loaded script names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }

    /// Look up a script.
    pub fn get(&self, name: &str) -> Option<&Script> {
        self.scripts.get(name)
    }

    /// All scripts, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &Script> {
        self.scripts.values()
    }

    /// Active script name.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Selector value: the active name or `Inactive`.
    pub fn active_label(&self) -> &str {
        self.active.as_deref().unwrap_or(SCRIPT_INACTIVE)
    }

    /// Apply a selector payload: `Inactive`, `Abort` or a script name.
    ///
    /// Selecting a script stops the one currently active first.
    /// Unknown names are logged and ignored.
    pub fn select(
        &mut self,
        payload: &str,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<(), HalError> {
        let choice = payload.trim();
        if choice.eq_ignore_ascii_case(SCRIPT_INACTIVE) || choice.eq_ignore_ascii_case(SCRIPT_ABORT) {
            if let Some(name) = self.active.take() {
                info!("Script '{name}' deactivated ({choice})");
                if let Some(script) = self.scripts.get_mut(&name) {
                    script.stop(now, controls, displays)?;
                }
            }
            return Ok(());
        }
        if !self.scripts.contains_key(choice) {
            warn!("ignoring unknown script '{choice}'");
            return Ok(());
        }
        if self.active.as_deref() == Some(choice) {
            return Ok(());
        }
        if let Some(previous) = self.active.take()
            && let Some(script) = self.scripts.get_mut(&previous)
        {
            script.stop(now, controls, displays)?;
        }
        if let Some(script) = self.scripts.get_mut(choice) {
            script.start(now, controls);
            self.active = Some(choice.to_string());
        }
        Ok(())
    }

    /// Run the active script one pass; clears the selection when it ends.
    ///
    /// Returns true while a script is active.
    pub fn execute(
        &mut self,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<bool, HalError> {
        let Some(name) = self.active.clone() else {
            return Ok(false);
        };
        let Some(script) = self.scripts.get_mut(&name) else {
            self.active = None;
            return Ok(false);
        };
        if script.execute(now, controls, displays)? == ScriptStatus::Idle {
            info!("Script '{name}' finished");
            self.active = None;
            return Ok(false);
        }
        Ok(true)
    }

    /// Stop every running script and clear the selection.
    pub fn stop_all(
        &mut self,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<(), HalError> {
        self.active = None;
        let mut first = None;
        for script in self.scripts.values_mut() {
            if let Err(e) = script.stop(now, controls, displays) {
                warn!("Script '{}' did not stop cleanly: {e}", script.name());
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}
