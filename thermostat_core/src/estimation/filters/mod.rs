// thermostat_core/src/estimation/filters/mod.rs

pub mod low_pass;

pub use low_pass::LowPassFilter;
