// thermostat_core/src/estimation/run.rs

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::buffer::OutputBuffer;
use crate::error::EstimatorError;
use crate::estimation::{InitRequest, Lifecycle};
use crate::memory::StepMemory;
use crate::timeline::TimelineAllocator;
use crate::types::{SimTime, StateId, StepInput, StepStatus, Tick, Value};

/// Run bookkeeping shared by every estimator: lifecycle, tick counter, output
/// buffer and step memory.
///
/// A concrete model owns one `ModelRun` and only supplies the math. A step is
/// bracketed by [`begin_step`](ModelRun::begin_step) and
/// [`commit`](ModelRun::commit); the tick advances only in `commit`, and only
/// once every value has been accepted by its column.
#[derive(Debug, Clone)]
pub struct ModelRun {
    output_states: Vec<StateId>,
    lifecycle: Lifecycle,
    tick: Tick,
    step_size: Option<SimTime>,
    start_utc: Option<DateTime<Utc>>,
    output: Option<OutputBuffer>,
    memory: StepMemory,
}

impl ModelRun {
    pub fn new(output_states: &[StateId]) -> Self {
        Self {
            output_states: output_states.to_vec(),
            lifecycle: Lifecycle::Uninitialized,
            tick: 0,
            step_size: None,
            start_utc: None,
            output: None,
            memory: StepMemory::new(output_states),
        }
    }

    /// Starts a fresh run. Any previous buffer is dropped and replaced in full.
    pub fn initialize(&mut self, request: &InitRequest<'_>, model_name: &str) -> Result<(), EstimatorError> {
        let buffer = TimelineAllocator::new(request.registry, request.categories)
            .allocate(&request.timeline, &self.output_states)?;

        self.output = Some(buffer);
        self.memory.reset();
        self.tick = 0;
        self.step_size = Some(request.timeline.t_step());
        self.start_utc = Some(request.start_utc);
        self.lifecycle = Lifecycle::Initialized;

        debug!(
            model = model_name,
            samples = request.timeline.sample_count(),
            start = %request.start_utc,
            "estimator initialized"
        );
        Ok(())
    }

    /// Checks the step contract and marks the current tick as running.
    /// Returns the tick the step will be written to.
    pub fn begin_step(&mut self, step_input: &StepInput, input_states: &[StateId]) -> Result<Tick, EstimatorError> {
        if !matches!(self.lifecycle, Lifecycle::Initialized | Lifecycle::Stepping) {
            return Err(EstimatorError::NotInitialized);
        }
        let buffer = self.output.as_mut().ok_or(EstimatorError::NotInitialized)?;
        if self.tick >= buffer.len() {
            return Err(EstimatorError::TimelineExhausted {
                tick: self.tick,
                len: buffer.len(),
            });
        }
        for state in input_states {
            step_input.require(*state)?;
        }

        buffer.set_status(self.tick, StepStatus::RUNNING)?;
        Ok(self.tick)
    }

    /// Writes one step's results to the step memory and the output buffer,
    /// records `status`, then advances the tick by one.
    ///
    /// `values` must hold every output state exactly once.
    pub fn commit(&mut self, values: &[(StateId, Value)], status: StepStatus) -> Result<StepStatus, EstimatorError> {
        let buffer = self.output.as_mut().ok_or(EstimatorError::NotInitialized)?;

        // Validate everything first so a rejected step leaves the tick untouched.
        for expected in &self.output_states {
            match values.iter().filter(|(state, _)| state == expected).count() {
                0 => return Err(EstimatorError::MissingOutput(*expected)),
                1 => {}
                _ => return Err(EstimatorError::DuplicateOutput(*expected)),
            }
        }
        for (state, value) in values {
            if !self.memory.contains(*state) {
                return Err(EstimatorError::UnknownOutput(*state));
            }
            buffer.check(*state, value)?;
        }

        for (state, value) in values {
            self.memory.store(*state, value.clone())?;
            buffer.write(*state, self.tick, value)?;
        }
        buffer.set_status(self.tick, status)?;

        self.tick += 1;
        self.lifecycle = Lifecycle::Stepping;
        Ok(status)
    }

    pub fn tear_down(&mut self, model_name: &str) -> Result<(), EstimatorError> {
        match self.lifecycle {
            Lifecycle::Initialized | Lifecycle::Stepping => {
                self.output = None;
                self.memory.reset();
                self.lifecycle = Lifecycle::TornDown;
                debug!(model = model_name, steps = self.tick, "estimator torn down");
                Ok(())
            }
            from => Err(EstimatorError::InvalidTransition {
                from,
                action: "tear down",
            }),
        }
    }

    pub fn memory(&self) -> &StepMemory {
        &self.memory
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn step_size(&self) -> Option<SimTime> {
        self.step_size
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start_utc
    }

    pub fn output(&self) -> Option<&OutputBuffer> {
        self.output.as_ref()
    }

    pub fn take_output(&mut self) -> Option<OutputBuffer> {
        self.output.take()
    }
}
