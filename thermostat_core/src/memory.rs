// thermostat_core/src/memory.rs

use std::collections::HashMap;

use crate::error::EstimatorError;
use crate::types::{StateId, Value};

/// The last value an estimator produced for each of its output states.
///
/// This is the recursive state carried from one tick to the next. It is kept
/// apart from the output buffer so a filter never has to read back from the
/// (possibly very long) preallocated series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepMemory {
    slots: HashMap<StateId, Option<Value>>,
}

impl StepMemory {
    /// One unset slot per output state. Slots are never added afterwards, so
    /// storing a value during a step does not allocate.
    pub fn new(output_states: &[StateId]) -> Self {
        Self {
            slots: output_states.iter().map(|state| (*state, None)).collect(),
        }
    }

    /// Forget every estimate; the next step for each state is a cold start.
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            *slot = None;
        }
    }

    pub fn previous(&self, state: StateId) -> Option<&Value> {
        self.slots.get(&state)?.as_ref()
    }

    pub fn previous_f64(&self, state: StateId) -> Option<f64> {
        self.previous(state)?.as_f64()
    }

    /// `true` while no estimate has been stored for `state`.
    pub fn is_cold(&self, state: StateId) -> bool {
        self.previous(state).is_none()
    }

    pub fn store(&mut self, state: StateId, value: Value) -> Result<(), EstimatorError> {
        let slot = self
            .slots
            .get_mut(&state)
            .ok_or(EstimatorError::UnknownOutput(state))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.slots.contains_key(&state)
    }
}
