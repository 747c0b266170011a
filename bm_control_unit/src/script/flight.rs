//! Flight timeline compiler.
//!
//! Produces one MET/altitude/velocity sample per integer second of the
//! script. The sample for second `t` is stored before the step `t → t+1`
//! is integrated. A step belongs to the first block whose end lies after
//! `t`; rates are recomputed whenever that block changes, so a
//! `final_*` target is reached exactly at the block's end.

use bm_common::format::{Seg7Text, UnitSystem, number_7s_default, round_to, time_7s};
use bm_common::script::{FlightDef, FlightValue, MetState, RateKeyword};

use super::ScriptError;
use super::block::Block;

/// Compiled sample for one second.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightTick {
    /// Mission elapsed time [s].
    pub met: i64,
    /// Altitude [km], three decimals.
    pub altitude: f64,
    /// Velocity [km/h], three decimals.
    pub velocity: f64,
    /// MET as display text.
    pub met_text: Seg7Text,
    /// Altitude as display text, in the script's units.
    pub alt_text: Seg7Text,
    /// Velocity as display text, in the script's units.
    pub vel_text: Seg7Text,
}

/// Whole compiled timeline, `total_run_time + 1` samples.
#[derive(Debug, Clone, Default)]
pub struct FlightTable {
    ticks: Vec<FlightTick>,
}

impl FlightTable {
    /// Sample at second `t`, clamped to the last one.
    pub fn at(&self, t: u64) -> Option<&FlightTick> {
        let idx = usize::try_from(t).unwrap_or(usize::MAX).min(self.ticks.len().checked_sub(1)?);
        self.ticks.get(idx)
    }

    /// All samples.
    pub fn ticks(&self) -> &[FlightTick] {
        &self.ticks
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// True if nothing was compiled.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[derive(Debug, Default)]
struct Integrator {
    met: i64,
    met_state: MetState,
    alt: f64,
    vel: f64,
    da: f64,
    dv: f64,
}

enum Axis {
    Altitude,
    Velocity,
}

impl Integrator {
    /// Apply a block's flight record for `steps` remaining steps.
    /// Returns true if the block assigned an absolute MET.
    fn enter(&mut self, flight: &FlightDef, steps: u32) -> Result<bool, String> {
        self.rate(Axis::Altitude, flight.final_altitude, flight.alt, steps)?;
        self.rate(Axis::Velocity, flight.final_velocity, flight.vel, steps)?;
        if let Some(state) = flight.met_state {
            self.met_state = state;
        }
        Ok(match flight.met {
            Some(met) => {
                self.met = met;
                true
            }
            None => false,
        })
    }

    fn rate(
        &mut self,
        axis: Axis,
        target: Option<f64>,
        value: Option<FlightValue>,
        steps: u32,
    ) -> Result<(), String> {
        let (current, rate, what) = match axis {
            Axis::Altitude => (&mut self.alt, &mut self.da, "altitude"),
            Axis::Velocity => (&mut self.vel, &mut self.dv, "velocity"),
        };
        if let Some(FlightValue::Literal(v)) = value {
            *current = v;
            *rate = 0.0;
        }
        match (target, value) {
            (Some(target), _) => *rate = (target - *current) / f64::from(steps.max(1)),
            (None, Some(FlightValue::Literal(_))) => {}
            (None, Some(FlightValue::Keyword(RateKeyword::Glide))) => {}
            (None, Some(FlightValue::Keyword(RateKeyword::Freeze))) => *rate = 0.0,
            (None, None) => return Err(format!("no {what} rate, target or keyword")),
        }
        Ok(())
    }

    fn step(&mut self, met_assigned: bool) {
        if !met_assigned && self.met_state == MetState::Run {
            self.met += 1;
        }
        self.alt += self.da;
        self.vel += self.dv;
    }

    fn sample(&self, units: UnitSystem) -> FlightTick {
        let altitude = round_to(self.alt, 3);
        let velocity = round_to(self.vel, 3);
        FlightTick {
            met: self.met,
            altitude,
            velocity,
            met_text: time_7s(self.met),
            alt_text: number_7s_default(round_to(units.altitude(altitude), 3)),
            vel_text: number_7s_default(round_to(units.velocity(velocity), 3)),
        }
    }
}

/// Compile the timeline of laid-out `blocks`.
///
/// # Errors
/// `ScriptError::Flight` if a flight record gives neither a final value,
/// a literal nor a keyword for altitude or velocity.
pub fn compile(script: &str, blocks: &[Block], units: UnitSystem) -> Result<FlightTable, ScriptError> {
    let total = blocks.last().map_or(0, |b| b.end);
    let mut state = Integrator::default();
    let mut ticks = Vec::with_capacity(total as usize + 1);
    let mut governing: Option<usize> = None;

    for t in 0..=total {
        ticks.push(state.sample(units));
        if t == total {
            break;
        }
        let Some(index) = blocks.iter().position(|b| b.end > t) else {
            break;
        };
        let mut met_assigned = false;
        if governing != Some(index) {
            governing = Some(index);
            let block = &blocks[index];
            if let Some(flight) = &block.flight {
                met_assigned = state
                    .enter(flight, block.end - t)
                    .map_err(|reason| ScriptError::Flight {
                        script: script.to_string(),
                        block: block.label(index),
                        reason,
                    })?;
            }
        }
        state.step(met_assigned);
    }

    Ok(FlightTable { ticks })
}
