// thermostat_sim/src/prelude.rs

// Re-export the entire thermostat_core prelude so you can easily access
// pure types like `StateId`, `StepInput`, `EstimatorModel`, etc.
pub use thermostat_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::channels::{DateTimeChannel, TimezoneResolver, TzfResolver};
pub use crate::config::{
    EstimatorConfig, Location, SettingsChange, Simulation, SimulationConfig, StepFailurePolicy,
};
pub use crate::data_spec::{default_categories, thermostat_registry};
pub use crate::error::{ConfigError, SimulationError, TimezoneError};
pub use crate::simulator::{SimulationReport, Simulator};
