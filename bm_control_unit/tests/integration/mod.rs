pub mod harness;

mod basic_script;
mod cleanup;
mod control_roundtrip;
mod discovery;
mod flasher_cadence;
mod flight_script;
mod offline;
mod syscmd;
