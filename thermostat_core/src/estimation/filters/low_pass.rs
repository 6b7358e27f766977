// thermostat_core/src/estimation/filters/low_pass.rs

use tracing::trace;

use crate::buffer::OutputBuffer;
use crate::error::EstimatorError;
use crate::estimation::{EstimatorModel, InitRequest, Lifecycle, ModelRun, Settings};
use crate::types::{SimTime, StateId, StepInput, StepStatus, Tick, Value};

const INPUT_STATES: [StateId; 3] = [
    StateId::ThermostatTemperature,
    StateId::ThermostatHumidity,
    StateId::ThermostatMotion,
];

const OUTPUT_STATES: [StateId; 3] = [
    StateId::ThermostatTemperatureEstimate,
    StateId::ThermostatHumidityEstimate,
    StateId::ThermostatMotionEstimate,
];

/// Exponential smoothing of the thermostat's temperature and humidity sensors.
///
/// Each filtered state follows `y[i] = y[i-1] + α (x[i] - y[i-1])`, with the
/// first estimate taken straight from the measurement. Motion is passed
/// through unfiltered. The default coefficients of `1.0` disable smoothing.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha_temperature: f64,
    alpha_humidity: f64,
    run: ModelRun,
}

fn check_alpha(name: &'static str, value: f64) -> Result<f64, EstimatorError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(EstimatorError::InvalidCoefficient { name, value })
    }
}

impl LowPassFilter {
    /// Creates a filter with one smoothing coefficient per filtered state.
    /// Both must lie in `(0, 1]`; they cannot be changed afterwards.
    pub fn new(alpha_temperature: f64, alpha_humidity: f64) -> Result<Self, EstimatorError> {
        Ok(Self {
            alpha_temperature: check_alpha("alpha_temperature", alpha_temperature)?,
            alpha_humidity: check_alpha("alpha_humidity", alpha_humidity)?,
            run: ModelRun::new(&OUTPUT_STATES),
        })
    }

    pub fn alpha_temperature(&self) -> f64 {
        self.alpha_temperature
    }

    pub fn alpha_humidity(&self) -> f64 {
        self.alpha_humidity
    }

    /// One exponential smoothing update. `None` means no estimate exists yet
    /// (cold start), in which case the measurement is returned unchanged.
    pub fn filter(state: f64, prev_state_estimate: Option<f64>, alpha: f64) -> f64 {
        match prev_state_estimate {
            Some(prev) => prev + alpha * (state - prev),
            None => state,
        }
    }

    /// The temperature the thermostat controls on: the sensed temperature.
    pub fn control_temperature(step_input: &StepInput) -> Result<f64, EstimatorError> {
        step_input.require_f64(StateId::ThermostatTemperature)
    }

    /// Read-only access to the run bookkeeping, mostly for inspection in tests.
    pub fn run(&self) -> &ModelRun {
        &self.run
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self {
            alpha_temperature: 1.0,
            alpha_humidity: 1.0,
            run: ModelRun::new(&OUTPUT_STATES),
        }
    }
}

impl EstimatorModel for LowPassFilter {
    fn model_name(&self) -> &str {
        "LowPass"
    }

    fn input_states(&self) -> &[StateId] {
        &INPUT_STATES
    }

    fn output_states(&self) -> &[StateId] {
        &OUTPUT_STATES
    }

    fn initialize(&mut self, request: &InitRequest<'_>) -> Result<(), EstimatorError> {
        self.run.initialize(request, "LowPass")
    }

    fn do_step(
        &mut self,
        t_start: SimTime,
        t_step: SimTime,
        step_input: &StepInput,
    ) -> Result<StepStatus, EstimatorError> {
        let tick = self.run.begin_step(step_input, &INPUT_STATES)?;
        let memory = self.run.memory();

        let temperature = Self::filter(
            step_input.require_f64(StateId::ThermostatTemperature)?,
            memory.previous_f64(StateId::ThermostatTemperatureEstimate),
            self.alpha_temperature,
        );
        let humidity = Self::filter(
            step_input.require_f64(StateId::ThermostatHumidity)?,
            memory.previous_f64(StateId::ThermostatHumidityEstimate),
            self.alpha_humidity,
        );
        // Non-filtered state.
        let motion = step_input.require(StateId::ThermostatMotion)?.clone();

        trace!(tick, t_start, t_step, temperature, humidity, "low pass step");

        self.run.commit(
            &[
                (StateId::ThermostatTemperatureEstimate, Value::Float(temperature)),
                (StateId::ThermostatHumidityEstimate, Value::Float(humidity)),
                (StateId::ThermostatMotionEstimate, motion),
            ],
            StepStatus::SUCCESS,
        )
    }

    fn tear_down(&mut self) -> Result<(), EstimatorError> {
        // No external resources to release.
        self.run.tear_down("LowPass")
    }

    fn change_settings(&mut self, _new_settings: &Settings) -> Result<(), EstimatorError> {
        // This model has no runtime settings.
        Ok(())
    }

    fn lifecycle(&self) -> Lifecycle {
        self.run.lifecycle()
    }

    fn current_tick(&self) -> Tick {
        self.run.tick()
    }

    fn output(&self) -> Option<&OutputBuffer> {
        self.run.output()
    }

    fn take_output(&mut self) -> Option<OutputBuffer> {
        self.run.take_output()
    }
}
