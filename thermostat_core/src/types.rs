// thermostat_core/src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EstimatorError;

// --- Core Type Aliases ---
/// Zero-based index into the simulation timeline.
pub type Tick = usize;
/// Simulation time, in the integer unit shared by `t_start`, `t_end` and `t_step`.
pub type SimTime = i64;

// --- Core Identifier ---
/// Every quantity the pipeline knows about.
///
/// Input states are consumed by estimators, output states are produced by them.
/// `SimulationTime` and `StepStatus` are reserved: every output buffer carries
/// them, and no model may declare them as its own outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateId {
    // --- Reserved ---
    SimulationTime,
    StepStatus,
    // --- Sensor inputs ---
    ThermostatTemperature,
    ThermostatHumidity,
    ThermostatMotion,
    // --- Estimates ---
    ThermostatTemperatureEstimate,
    ThermostatHumidityEstimate,
    ThermostatMotionEstimate,
    // --- Controller / equipment states ---
    TemperatureCtrl,
    HvacMode,
    SystemMode,
    CalendarEvent,
    AuxiliaryHeatStage,
}

impl StateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateId::SimulationTime => "simulation_time",
            StateId::StepStatus => "step_status",
            StateId::ThermostatTemperature => "thermostat_temperature",
            StateId::ThermostatHumidity => "thermostat_humidity",
            StateId::ThermostatMotion => "thermostat_motion",
            StateId::ThermostatTemperatureEstimate => "thermostat_temperature_estimate",
            StateId::ThermostatHumidityEstimate => "thermostat_humidity_estimate",
            StateId::ThermostatMotionEstimate => "thermostat_motion_estimate",
            StateId::TemperatureCtrl => "temperature_ctrl",
            StateId::HvacMode => "hvac_mode",
            StateId::SystemMode => "system_mode",
            StateId::CalendarEvent => "calendar_event",
            StateId::AuxiliaryHeatStage => "auxiliary_heat_stage",
        }
    }

    /// `true` for the two states every output buffer owns implicitly.
    pub fn is_reserved(&self) -> bool {
        matches!(self, StateId::SimulationTime | StateId::StepStatus)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar observation or estimate.
///
/// Labels are reference counted so that moving a categorical value through a
/// step never allocates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Label(Arc<str>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Label(_) => "label",
        }
    }

    /// Numeric view of the value. Integers widen to `f64`; bools and labels have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Label(Arc::from(v))
    }
}

/// Outcome code written to the `step_status` series for every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StepStatus(pub i8);

impl StepStatus {
    pub const SUCCESS: StepStatus = StepStatus(0);
    /// Written when a step begins; still visible if the step never commits.
    pub const RUNNING: StepStatus = StepStatus(1);

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    pub fn code(&self) -> i8 {
        self.0
    }
}

/// The observations supplied to one `do_step` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInput {
    values: HashMap<StateId, Value>,
}

impl StepInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, handy when assembling inputs by hand.
    pub fn with(mut self, state: StateId, value: impl Into<Value>) -> Self {
        self.values.insert(state, value.into());
        self
    }

    pub fn insert(&mut self, state: StateId, value: impl Into<Value>) {
        self.values.insert(state, value.into());
    }

    pub fn get(&self, state: StateId) -> Option<&Value> {
        self.values.get(&state)
    }

    /// Returns the value for `state`, or a contract error if the caller omitted it.
    pub fn require(&self, state: StateId) -> Result<&Value, EstimatorError> {
        self.values
            .get(&state)
            .ok_or(EstimatorError::MissingInput(state))
    }

    /// Like [`StepInput::require`], but the value must be numeric.
    pub fn require_f64(&self, state: StateId) -> Result<f64, EstimatorError> {
        let value = self.require(state)?;
        value.as_f64().ok_or(EstimatorError::InputType {
            state,
            expected: "numeric",
            found: value.kind(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(StateId, Value)> for StepInput {
    fn from_iter<I: IntoIterator<Item = (StateId, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
