// thermostat_core/src/estimation/mod.rs

use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::buffer::OutputBuffer;
use crate::error::EstimatorError;
use crate::states::{CategoryTable, StateTypeRegistry};
use crate::timeline::Timeline;
use crate::types::{SimTime, StateId, StepInput, StepStatus, Tick, Value};

/// Where a model is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Initialized,
    Stepping,
    TornDown,
}

/// Everything a model needs to prepare a run.
/// This struct is created and passed in by the simulation (`thermostat_sim`) layer.
#[derive(Debug, Clone, Copy)]
pub struct InitRequest<'a> {
    /// Wall-clock instant of `t_start`.
    pub start_utc: DateTime<Utc>,
    pub timeline: Timeline,
    /// Read-only state type specification.
    pub registry: &'a StateTypeRegistry,
    /// Label sets of the categorical output states.
    pub categories: &'a CategoryTable,
}

/// Runtime configuration pushed into a model mid-run.
pub type Settings = HashMap<String, Value>;

/// The contract for any algorithm that performs the "State Estimator" role in
/// a time-stepped simulation.
///
/// The simulator calls [`initialize`](EstimatorModel::initialize) once, then
/// [`do_step`](EstimatorModel::do_step) once per tick in increasing tick order,
/// then [`tear_down`](EstimatorModel::tear_down). Implementations should keep
/// `do_step` free of allocation; all storage is sized during `initialize`.
pub trait EstimatorModel: DynClone + Debug + Send + Sync {
    /// A short identifier used in logs and reports.
    fn model_name(&self) -> &str;

    /// The states every `step_input` must contain. Fixed at construction.
    fn input_states(&self) -> &[StateId];

    /// The states every `do_step` populates. Fixed at construction.
    fn output_states(&self) -> &[StateId];

    /// Resets the tick counter, allocates the output buffer and clears the
    /// step memory. Configuration problems are reported here, before any step.
    fn initialize(&mut self, request: &InitRequest<'_>) -> Result<(), EstimatorError>;

    /// Advances the model by one tick and returns the step status code.
    /// A non-zero status reports a model failure without aborting the run.
    fn do_step(
        &mut self,
        t_start: SimTime,
        t_step: SimTime,
        step_input: &StepInput,
    ) -> Result<StepStatus, EstimatorError>;

    /// Releases the run's storage and any external resource the model holds.
    fn tear_down(&mut self) -> Result<(), EstimatorError>;

    /// Applies runtime settings. Callable in any lifecycle state.
    fn change_settings(&mut self, new_settings: &Settings) -> Result<(), EstimatorError>;

    fn lifecycle(&self) -> Lifecycle;

    /// Number of steps committed since the last `initialize`.
    fn current_tick(&self) -> Tick;

    fn output(&self) -> Option<&OutputBuffer>;

    /// Moves the output buffer out of the model, typically right before `tear_down`.
    fn take_output(&mut self) -> Option<OutputBuffer>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn EstimatorModel>`.
dyn_clone::clone_trait_object!(EstimatorModel);

mod run;
pub use run::ModelRun;

pub mod filters;
