//! Script blocks laid out on the integer timeline.

use bm_common::script::{BlockDef, FlightDef};
use tracing::warn;

use super::ScriptError;

/// Whether a block's actions have fired in the current loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStatus {
    /// Not yet fired.
    #[default]
    Pending,
    /// Fired.
    Complete,
}

/// One block with resolved actions and absolute times.
#[derive(Debug, Clone)]
pub struct Block {
    /// Optional label.
    pub name: Option<String>,
    /// Duration [s].
    pub run_time: u32,
    /// Start offset in the script [s].
    pub start: u32,
    /// End offset in the script [s].
    pub end: u32,
    /// Target per known control, unmentioned controls off.
    pub actions: Vec<(String, bool)>,
    /// Flight record, if any.
    pub flight: Option<FlightDef>,
    /// Fire state.
    pub status: BlockStatus,
}

impl Block {
    /// Label for logs.
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("#{index}"))
    }
}

/// Lay blocks end to end with a one-second separator and resolve actions
/// against `controls`.
///
/// Unknown control ids are dropped with a warning.
///
/// # Errors
/// [`ScriptError::TooLong`] when an offset overflows.
pub fn layout(
    script: &str,
    defs: &[BlockDef],
    controls: &[String],
) -> Result<Vec<Block>, ScriptError> {
    let mut blocks = Vec::with_capacity(defs.len());
    let mut start = 0u32;
    for (index, def) in defs.iter().enumerate() {
        for id in def.controls.keys() {
            if !controls.iter().any(|c| c == id) {
                warn!("script '{script}' block {index}: unknown control '{id}' dropped");
            }
        }
        let actions = controls
            .iter()
            .map(|id| {
                let on = def
                    .controls
                    .get(id)
                    .is_some_and(|target| target.eq_ignore_ascii_case("on"));
                (id.clone(), on)
            })
            .collect();
        let end = start
            .checked_add(def.run_time)
            .ok_or_else(|| ScriptError::TooLong(script.to_string()))?;
        blocks.push(Block {
            name: def.name.clone(),
            run_time: def.run_time,
            start,
            end,
            actions,
            flight: def.flight.clone(),
            status: BlockStatus::Pending,
        });
        start = end
            .checked_add(1)
            .ok_or_else(|| ScriptError::TooLong(script.to_string()))?;
    }
    Ok(blocks)
}
