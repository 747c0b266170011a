//! Script engine.
//!
//! A script is a list of timed blocks. While running, each `execute`
//! call moves to the block covering the elapsed time and fires its
//! actions once:
//!
//! ```text
//!          start                      execute past last block
//!   IDLE ─────────► RUNNING ──────────────────────────────────► IDLE
//!     ▲                │   (repeat: loop again while loops remain)
//!     └────────────────┘ stop
//! ```
//!
//! Flight scripts also carry a compiled timeline pushed to up to three
//! displays every pass.

pub mod block;
pub mod flight;
pub mod router;

use bm_common::config::{ConfigError, ConfigLoader};
use bm_common::hal::driver::HalError;
use bm_common::script::{AtCompletion, DisplayMap, RunMode, ScriptFile, ScriptKind};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::control::{ControlStatus, Controls};
use crate::display::Displays;
use block::{Block, BlockStatus};
use flight::FlightTable;

pub use router::ScriptRouter;

/// Script loading and compilation errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The file could not be read, parsed or validated.
    #[error("script load: {0}")]
    Load(#[from] ConfigError),

    /// A flight record is missing rate information.
    #[error("script '{script}' block {block}: {reason}")]
    Flight {
        /// Script name.
        script: String,
        /// Block label.
        block: String,
        /// What is wrong.
        reason: String,
    },

    /// Block offsets do not fit the timeline.
    #[error("script '{0}' is too long")]
    TooLong(String),
}

/// Runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptStatus {
    /// Not running.
    #[default]
    Idle,
    /// Executing blocks.
    Running,
}

impl ScriptStatus {
    /// Wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

/// A loaded, compiled script with its runtime state.
#[derive(Debug)]
pub struct Script {
    name: String,
    kind: ScriptKind,
    run: RunMode,
    loops: u32,
    at_completion: AtCompletion,
    blocks: Vec<Block>,
    flight: Option<FlightTable>,
    display_map: DisplayMap,
    status: ScriptStatus,
    start: Option<Duration>,
    current_loop: u32,
    active_block: Option<usize>,
    snapshot: Vec<(String, ControlStatus)>,
}

impl Script {
    /// Build from a parsed file. `controls` are the known control ids.
    ///
    /// # Errors
    /// Validation failure or a flight block without rate information.
    pub fn from_file(file: ScriptFile, controls: &[String]) -> Result<Self, ScriptError> {
        file.validate()?;
        let name = file.script.trim().to_string();
        let blocks = block::layout(&name, &file.blocks, controls)?;
        let flight = match file.kind {
            ScriptKind::Flight => Some(flight::compile(&name, &blocks, file.units)?),
            ScriptKind::Basic => None,
        };
        let script = Self {
            kind: file.kind,
            run: file.run,
            loops: file.loops.unwrap_or(1),
            at_completion: file.at_completion,
            blocks,
            flight,
            display_map: file.display_map.unwrap_or_default(),
            status: ScriptStatus::Idle,
            start: None,
            current_loop: 0,
            active_block: None,
            snapshot: Vec::new(),
            name,
        };
        debug!(
            "Script '{}' ({:?}, {:?}): {} blocks, {}s",
            script.name,
            script.kind,
            script.run,
            script.blocks.len(),
            script.total_run_time()
        );
        Ok(script)
    }

    /// Load a script file.
    pub fn load(path: &Path, controls: &[String]) -> Result<Self, ScriptError> {
        let file = ScriptFile::load(path)?;
        Self::from_file(file, controls)
    }

    /// Script name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Basic or flight.
    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    /// Idle or running.
    pub fn status(&self) -> ScriptStatus {
        self.status
    }

    /// End of the last block [s].
    pub fn total_run_time(&self) -> u32 {
        self.blocks.last().map_or(0, |b| b.end)
    }

    /// Laid-out blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Compiled flight timeline.
    pub fn flight(&self) -> Option<&FlightTable> {
        self.flight.as_ref()
    }

    /// Display routing for flight values.
    pub fn display_map(&self) -> &DisplayMap {
        &self.display_map
    }

    /// Loop in progress, 1-based; 0 when idle.
    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    /// Index of the block in effect.
    pub fn active_block(&self) -> Option<usize> {
        self.active_block
    }

    /// `start` or `stop`; anything else is logged and ignored.
    pub fn set(
        &mut self,
        command: &str,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<(), HalError> {
        match command.trim().to_ascii_lowercase().as_str() {
            "start" => {
                self.start(now, controls);
                Ok(())
            }
            "stop" => self.stop(now, controls, displays),
            other => {
                warn!("script '{}': ignoring command '{other}'", self.name);
                Ok(())
            }
        }
    }

    /// Begin at block 0. Starting a running script changes nothing.
    pub fn start(&mut self, now: Duration, controls: &Controls) {
        if self.status == ScriptStatus::Running {
            return;
        }
        self.status = ScriptStatus::Running;
        self.start = Some(now);
        self.current_loop = 1;
        self.active_block = None;
        self.snapshot = match self.at_completion {
            AtCompletion::Restore => controls
                .iter()
                .map(|c| (c.id().to_string(), c.status()))
                .collect(),
            AtCompletion::Off => Vec::new(),
        };
        info!("Script '{}' started", self.name);
    }

    /// Return to idle and settle the controls. Stopping an idle script
    /// changes nothing.
    pub fn stop(
        &mut self,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<(), HalError> {
        if self.status == ScriptStatus::Idle {
            return Ok(());
        }
        self.status = ScriptStatus::Idle;
        self.start = None;
        self.active_block = None;
        self.current_loop = 0;
        self.reset_blocks();

        // Every output is attempted; the first failure is reported last.
        let mut first = None;
        let mut keep = |result: Result<(), HalError>| {
            if let Err(e) = result {
                first.get_or_insert(e);
            }
        };
        match self.at_completion {
            AtCompletion::Restore => {
                for (id, status) in std::mem::take(&mut self.snapshot) {
                    let Some(control) = controls.get_mut(&id) else {
                        continue;
                    };
                    match status {
                        ControlStatus::On => keep(control.set_on(true, now)),
                        ControlStatus::Off => keep(control.set_on(false, now)),
                        ControlStatus::Unavailable => {}
                    }
                }
            }
            AtCompletion::Off => {
                for control in controls.iter_mut() {
                    keep(control.set_on(false, now));
                }
            }
        }
        for id in self.flight_displays() {
            if let Some(display) = displays.get_mut(&id) {
                keep(display.off());
            }
        }
        info!("Script '{}' stopped", self.name);
        first.map_or(Ok(()), Err)
    }

    fn reset_blocks(&mut self) {
        for block in &mut self.blocks {
            block.status = BlockStatus::Pending;
        }
    }

    fn flight_displays(&self) -> Vec<String> {
        if self.flight.is_none() {
            return Vec::new();
        }
        [&self.display_map.met, &self.display_map.alt, &self.display_map.vel]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// One engine pass. Returns the status after the pass.
    pub fn execute(
        &mut self,
        now: Duration,
        controls: &mut Controls,
        displays: &mut Displays,
    ) -> Result<ScriptStatus, HalError> {
        let Some(start) = self.start else {
            return Ok(self.status);
        };
        if self.status != ScriptStatus::Running {
            return Ok(self.status);
        }

        let mut elapsed = now.saturating_sub(start).as_secs();
        let mut index = self.active_block.unwrap_or(0);
        while index < self.blocks.len() && elapsed >= u64::from(self.blocks[index].end) {
            index += 1;
        }

        if index >= self.blocks.len() {
            if self.run == RunMode::Repeat && self.current_loop < self.loops {
                self.current_loop += 1;
                self.reset_blocks();
                self.start = Some(now);
                elapsed = 0;
                index = 0;
                debug!("Script '{}' loop {}/{}", self.name, self.current_loop, self.loops);
            } else {
                self.stop(now, controls, displays)?;
                return Ok(ScriptStatus::Idle);
            }
        }
        self.active_block = Some(index);

        let block = &mut self.blocks[index];
        if block.status == BlockStatus::Pending {
            debug!("Script '{}' block {}", self.name, block.label(index));
            for (id, on) in &block.actions {
                if let Some(control) = controls.get_mut(id) {
                    control.set_on(*on, now)?;
                }
            }
            block.status = BlockStatus::Complete;
        }

        if let Some(tick) = self.flight.as_ref().and_then(|f| f.at(elapsed)) {
            let map = &self.display_map;
            for (target, text) in [
                (&map.met, &tick.met_text),
                (&map.alt, &tick.alt_text),
                (&map.vel, &tick.vel_text),
            ] {
                if let Some(display) = target.as_deref().and_then(|id| displays.get_mut(id)) {
                    display.show(text)?;
                }
            }
        }
        Ok(ScriptStatus::Running)
    }
}
