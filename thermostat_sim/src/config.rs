// thermostat_sim/src/config.rs

use chrono::{DateTime, Utc};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use thermostat_core::error::{EstimatorError, TimelineError};
use thermostat_core::estimation::filters::LowPassFilter;
use thermostat_core::estimation::{EstimatorModel, Settings};
use thermostat_core::states::{CategoryTable, Dtype};
use thermostat_core::timeline::Timeline;
use thermostat_core::types::{SimTime, StateId};

use crate::data_spec::{default_categories, thermostat_registry};
use crate::error::ConfigError;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # SimulationConfig
/// All configuration for one simulation run.
/// This struct is the root of the data parsed from a `simulation.toml` file.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct SimulationConfig {
    pub simulation: Simulation,

    #[serde(default)]
    pub location: Location,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Label sets for categorical states. Entries replace the defaults of the
    /// thermostat data spec state by state.
    #[serde(default)]
    pub categories: BTreeMap<StateId, Vec<String>>,

    /// The TOML has `[[settings_changes]]`, which becomes a Vec of SettingsChange structs.
    #[serde(default)]
    pub settings_changes: Vec<SettingsChange>,
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::file(path))
            .extract::<Self>()?
            .validated()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::string(toml))
            .extract::<Self>()?
            .validated()
    }

    /// Checks what serde cannot: label overrides must target a categorical
    /// state of the thermostat data spec.
    fn validated(self) -> Result<Self, ConfigError> {
        let registry = thermostat_registry();
        for state in self.categories.keys() {
            if registry.dtype(*state).ok() != Some(Dtype::Category) {
                return Err(ConfigError::NotCategorical(*state));
            }
        }
        Ok(self)
    }

    pub fn timeline(&self) -> Result<Timeline, TimelineError> {
        Timeline::new(
            self.simulation.t_start,
            self.simulation.t_end,
            self.simulation.t_step,
        )
    }

    /// The default category table with this config's overrides applied.
    pub fn category_table(&self) -> CategoryTable {
        let mut table = default_categories();
        for (state, labels) in &self.categories {
            table.insert(*state, labels);
        }
        table
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in the simulation.toml file.
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    #[serde(default)]
    pub t_start: SimTime,
    pub t_end: SimTime,
    pub t_step: SimTime,
    /// Wall-clock instant of `t_start`, RFC 3339.
    pub start_utc: DateTime<Utc>,
    #[serde(default)]
    pub on_step_failure: StepFailurePolicy,
}

/// What the simulator does when a step reports a non-zero status.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepFailurePolicy {
    #[default]
    Abort,
    Continue,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_alpha() -> f64 {
    1.0
}

/// Which estimator to run, tagged by `model = "..."`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EstimatorConfig {
    LowPass {
        #[serde(default = "default_alpha")]
        alpha_temperature: f64,
        #[serde(default = "default_alpha")]
        alpha_humidity: f64,
    },
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig::LowPass {
            alpha_temperature: default_alpha(),
            alpha_humidity: default_alpha(),
        }
    }
}

impl EstimatorConfig {
    pub fn build(&self) -> Result<Box<dyn EstimatorModel>, EstimatorError> {
        match self {
            EstimatorConfig::LowPass {
                alpha_temperature,
                alpha_humidity,
            } => Ok(Box::new(LowPassFilter::new(
                *alpha_temperature,
                *alpha_humidity,
            )?)),
        }
    }
}

/// Settings pushed into the model once the simulation reaches time `at`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsChange {
    pub at: SimTime,
    #[serde(default)]
    pub settings: Settings,
}
