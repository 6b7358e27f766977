// thermostat_core/src/error.rs

use thiserror::Error;

use crate::estimation::Lifecycle;
use crate::types::{SimTime, StateId, Tick};

/// Rejected `(t_start, t_end, t_step)` triples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("invalid timeline: t_step must be positive, got {t_step}")]
    NonPositiveStep { t_step: SimTime },
    #[error("invalid timeline: t_end ({t_end}) precedes t_start ({t_start})")]
    EndBeforeStart { t_start: SimTime, t_end: SimTime },
    #[error("invalid timeline: [{t_start}, {t_end}] with step {t_step} has more samples than a run can hold")]
    TooManySamples {
        t_start: SimTime,
        t_end: SimTime,
        t_step: SimTime,
    },
}

/// Configuration problems found while preallocating an output buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error("state '{0}' is not declared in the state type registry")]
    UnknownState(StateId),
    #[error("state '{0}' is reserved and cannot be declared as a model output")]
    ReservedState(StateId),
    #[error("output state '{0}' is declared more than once")]
    DuplicateState(StateId),
    #[error("fill value declared for state '{0}' does not fit its storage")]
    InvalidFill(StateId),
    #[error("categorical state '{0}' has no category label set")]
    MissingCategories(StateId),
    #[error("categorical state '{0}' has an empty category label set")]
    EmptyCategories(StateId),
    #[error("categorical state '{state}' has {count} labels, more than a column can index")]
    TooManyCategories { state: StateId, count: usize },
}

/// A write that does not fit the column it targets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    #[error("output buffer has no column for state '{0}'")]
    UnknownState(StateId),
    #[error("index {index} is outside the output buffer (length {len})")]
    IndexOutOfBounds { index: Tick, len: usize },
    #[error("state '{state}' stores {expected} values, got {found}")]
    TypeMismatch {
        state: StateId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} does not fit the {width} column of state '{state}'")]
    OutOfRange {
        state: StateId,
        width: &'static str,
        value: i64,
    },
    #[error("label '{label}' is not a category of state '{state}'")]
    UnknownCategory { state: StateId, label: String },
}

/// Everything an `EstimatorModel` can report back to the simulator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("do_step called before initialize")]
    NotInitialized,
    #[error("cannot {action} a model that is {from:?}")]
    InvalidTransition {
        from: Lifecycle,
        action: &'static str,
    },
    #[error("step input is missing required state '{0}'")]
    MissingInput(StateId),
    #[error("step input '{state}' must be {expected}, got {found}")]
    InputType {
        state: StateId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("model has no output state '{0}'")]
    UnknownOutput(StateId),
    #[error("step did not produce output state '{0}'")]
    MissingOutput(StateId),
    #[error("step produced output state '{0}' more than once")]
    DuplicateOutput(StateId),
    #[error("tick {tick} is past the end of the timeline ({len} samples)")]
    TimelineExhausted { tick: Tick, len: usize },
    #[error("smoothing coefficient {name} must lie in (0, 1], got {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
