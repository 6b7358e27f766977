// thermostat_sim/src/error.rs

use thermostat_core::error::{EstimatorError, TimelineError};
use thermostat_core::types::{StateId, Tick};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimezoneError {
    #[error("coordinates ({latitude}, {longitude}) are outside the valid range")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("no timezone found at ({latitude}, {longitude})")]
    NotFound { latitude: f64, longitude: f64 },
    #[error("'{0}' is not a known IANA timezone")]
    UnknownZone(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load simulation config: {0}")]
    Parse(#[from] figment::Error),
    #[error("[categories] entry '{0}' is not a categorical state")]
    NotCategorical(StateId),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Estimator(#[from] EstimatorError),
    #[error(transparent)]
    Timezone(#[from] TimezoneError),
    #[error("step {tick} reported failure status {status}")]
    StepFailed { tick: Tick, status: i8 },
    #[error("model returned no output buffer")]
    MissingOutput,
}
