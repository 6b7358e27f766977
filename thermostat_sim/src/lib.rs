// thermostat_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the thermostat_sim crate.
pub mod prelude;

// Everything needed to describe and drive a thermostat simulation run.
pub mod channels;
pub mod config;
pub mod data_spec;
pub mod error;
pub mod simulator;
