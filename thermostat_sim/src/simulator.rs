// thermostat_sim/src/simulator.rs

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use thermostat_core::buffer::OutputBuffer;
use thermostat_core::estimation::{EstimatorModel, InitRequest};
use thermostat_core::states::{CategoryTable, StateTypeRegistry};
use thermostat_core::types::StepInput;

use crate::channels::datetime::{DateTimeChannel, TimezoneResolver, TzfResolver};
use crate::config::{SimulationConfig, StepFailurePolicy};
use crate::data_spec::thermostat_registry;
use crate::error::SimulationError;

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub model_name: String,
    pub output: OutputBuffer,
    /// Number of `do_step` calls that completed.
    pub steps: usize,
    /// Steps that reported a non-zero status.
    pub failures: usize,
    pub timezone: Option<Tz>,
    /// `start_utc` in the building's local time, when the timezone is known.
    pub local_start: Option<DateTime<Tz>>,
}

/// Drives an estimator through `initialize → do_step* → tear_down`.
///
/// The configured model is kept as a prototype and every run works on a fresh
/// clone of it, so one simulator can serve any number of independent runs.
#[derive(Debug)]
pub struct Simulator<R = TzfResolver> {
    config: SimulationConfig,
    registry: StateTypeRegistry,
    categories: CategoryTable,
    prototype: Box<dyn EstimatorModel>,
    channel: DateTimeChannel<R>,
}

impl Simulator<TzfResolver> {
    pub fn from_config(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_resolver(config, TzfResolver)
    }
}

impl<R: TimezoneResolver> Simulator<R> {
    pub fn with_resolver(config: SimulationConfig, resolver: R) -> Result<Self, SimulationError> {
        // Fail on a bad timeline before anything else is built.
        config.timeline()?;
        let prototype = config.estimator.build()?;
        let channel = DateTimeChannel::with_resolver(
            config.location.latitude,
            config.location.longitude,
            resolver,
        );

        Ok(Self {
            registry: thermostat_registry(),
            categories: config.category_table(),
            prototype,
            channel,
            config,
        })
    }

    /// Replaces the model built from the config.
    pub fn with_model(mut self, model: Box<dyn EstimatorModel>) -> Self {
        self.prototype = model;
        self
    }

    /// Replaces the thermostat data spec.
    pub fn with_registry(mut self, registry: StateTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn channel(&self) -> &DateTimeChannel<R> {
        &self.channel
    }

    /// Runs the model over `inputs`, one input per tick starting at tick 0.
    ///
    /// The run ends when the inputs or the timeline run out, whichever comes
    /// first. Errors from the model abort the run after tearing the model down.
    pub fn run<I>(&self, inputs: I) -> Result<SimulationReport, SimulationError>
    where
        I: IntoIterator<Item = StepInput>,
    {
        let timeline = self.config.timeline()?;
        let timezone = self.channel.timezone()?;
        let local_start = self.channel.localize(self.config.simulation.start_utc)?;

        let mut model = self.prototype.clone();
        model.initialize(&InitRequest {
            start_utc: self.config.simulation.start_utc,
            timeline,
            registry: &self.registry,
            categories: &self.categories,
        })?;

        info!(
            model = model.model_name(),
            samples = timeline.sample_count(),
            t_step = timeline.t_step(),
            timezone = ?timezone,
            "starting simulation"
        );

        let mut changes: Vec<_> = self.config.settings_changes.iter().collect();
        changes.sort_by_key(|change| change.at);
        let mut pending = changes.into_iter().peekable();

        let mut steps = 0;
        let mut failures = 0;

        for (tick, step_input) in inputs.into_iter().enumerate() {
            let Some(t_start) = timeline.time_at(tick) else {
                warn!(
                    samples = timeline.sample_count(),
                    "more inputs than timeline samples, ignoring the rest"
                );
                break;
            };

            while let Some(change) = pending.next_if(|change| change.at <= t_start) {
                debug!(tick, at = change.at, "applying settings change");
                if let Err(err) = model.change_settings(&change.settings) {
                    return Err(abort(model.as_mut(), err.into()));
                }
            }

            let status = match model.do_step(t_start, timeline.t_step(), &step_input) {
                Ok(status) => status,
                Err(err) => return Err(abort(model.as_mut(), err.into())),
            };
            steps += 1;

            if !status.is_success() {
                failures += 1;
                warn!(tick, status = status.code(), "step reported failure");
                if self.config.simulation.on_step_failure == StepFailurePolicy::Abort {
                    return Err(abort(
                        model.as_mut(),
                        SimulationError::StepFailed {
                            tick,
                            status: status.code(),
                        },
                    ));
                }
            }
        }

        let output = match model.take_output() {
            Some(output) => output,
            None => return Err(abort(model.as_mut(), SimulationError::MissingOutput)),
        };
        model.tear_down()?;

        info!(model = model.model_name(), steps, failures, "simulation finished");
        Ok(SimulationReport {
            model_name: model.model_name().to_string(),
            output,
            steps,
            failures,
            timezone,
            local_start,
        })
    }
}

/// Tears the model down after a failed run and hands back the original error.
fn abort(model: &mut dyn EstimatorModel, err: SimulationError) -> SimulationError {
    if let Err(teardown) = model.tear_down() {
        warn!(error = %teardown, "tear down after failed run also failed");
    }
    err
}
