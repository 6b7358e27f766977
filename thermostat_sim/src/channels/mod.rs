// thermostat_sim/src/channels/mod.rs

//! Data channels that give the simulation its context.

pub mod datetime;

pub use datetime::{DateTimeChannel, TimezoneResolver, TzfResolver};
