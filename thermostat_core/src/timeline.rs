// thermostat_core/src/timeline.rs

use nalgebra::DVector;
use std::collections::HashSet;
use tracing::debug;

use crate::buffer::{Column, OutputBuffer};
use crate::error::{AllocationError, TimelineError};
use crate::states::{CategoryTable, Dtype, StateTypeRegistry};
use crate::types::{SimTime, StateId, Tick};

/// Upper bound on the samples of one run: two years at one-second resolution.
/// Every output column is sized from this count, so it also bounds allocation.
pub const MAX_SAMPLES: usize = 2 * 366 * 24 * 3600;

/// A validated `[t_start, t_end]` range sampled every `t_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    t_start: SimTime,
    t_end: SimTime,
    t_step: SimTime,
    samples: usize,
}

impl Timeline {
    /// Validates the bounds up front so that no buffer is ever sized from a
    /// zero, negative, overflowing or oversized sample count.
    pub fn new(t_start: SimTime, t_end: SimTime, t_step: SimTime) -> Result<Self, TimelineError> {
        if t_step <= 0 {
            return Err(TimelineError::NonPositiveStep { t_step });
        }
        if t_end < t_start {
            return Err(TimelineError::EndBeforeStart { t_start, t_end });
        }
        let too_many = TimelineError::TooManySamples {
            t_start,
            t_end,
            t_step,
        };
        let span = t_end.checked_sub(t_start).ok_or(too_many.clone())?;
        let samples = usize::try_from(span / t_step)
            .ok()
            .and_then(|n| n.checked_add(1))
            .filter(|n| *n <= MAX_SAMPLES)
            .ok_or(too_many)?;

        Ok(Self {
            t_start,
            t_end,
            t_step,
            samples,
        })
    }

    pub fn t_start(&self) -> SimTime {
        self.t_start
    }

    pub fn t_end(&self) -> SimTime {
        self.t_end
    }

    pub fn t_step(&self) -> SimTime {
        self.t_step
    }

    /// `floor((t_end - t_start) / t_step) + 1`
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// The time at the start of `tick`, if the tick lies on the timeline.
    pub fn time_at(&self, tick: Tick) -> Option<SimTime> {
        if tick >= self.samples {
            return None;
        }
        // In range by construction: tick * t_step <= t_end - t_start.
        Some(self.t_start + tick as SimTime * self.t_step)
    }

    /// The tick whose start time is exactly `time`.
    pub fn tick_of(&self, time: SimTime) -> Option<Tick> {
        if time < self.t_start || time > self.t_end {
            return None;
        }
        let offset = time - self.t_start;
        if offset % self.t_step != 0 {
            return None;
        }
        Some((offset / self.t_step) as Tick)
    }

    /// The arithmetic sequence `t_start, t_start + t_step, ...` of `sample_count` elements.
    pub fn times(&self) -> DVector<SimTime> {
        DVector::from_fn(self.samples, |i, _| self.t_start + i as SimTime * self.t_step)
    }
}

/// Sizes and fills the output buffer for one run from the read-only state
/// specification.
pub struct TimelineAllocator<'a> {
    registry: &'a StateTypeRegistry,
    categories: &'a CategoryTable,
}

impl<'a> TimelineAllocator<'a> {
    pub fn new(registry: &'a StateTypeRegistry, categories: &'a CategoryTable) -> Self {
        Self {
            registry,
            categories,
        }
    }

    /// Builds a brand-new buffer with one column per output state plus the
    /// `simulation_time` and `step_status` series.
    pub fn allocate(
        &self,
        timeline: &Timeline,
        output_states: &[StateId],
    ) -> Result<OutputBuffer, AllocationError> {
        let n_s = timeline.sample_count();
        let mut seen = HashSet::with_capacity(output_states.len());
        let mut columns = Vec::with_capacity(output_states.len());

        for &state in output_states {
            if state.is_reserved() {
                return Err(AllocationError::ReservedState(state));
            }
            if !seen.insert(state) {
                return Err(AllocationError::DuplicateState(state));
            }

            let column = match self.registry.dtype(state)? {
                Dtype::Category => {
                    let labels = self
                        .categories
                        .labels(state)
                        .ok_or(AllocationError::MissingCategories(state))?;
                    if labels.is_empty() {
                        return Err(AllocationError::EmptyCategories(state));
                    }
                    if labels.len() > u16::MAX as usize {
                        return Err(AllocationError::TooManyCategories {
                            state,
                            count: labels.len(),
                        });
                    }
                    Column::categorical(labels.clone(), n_s)
                }
                dtype => {
                    let layout = self
                        .registry
                        .layout(dtype)
                        .ok_or(AllocationError::UnknownState(state))?;
                    Column::numeric(state, &layout, n_s)
                        .map_err(|_| AllocationError::InvalidFill(state))?
                }
            };
            columns.push((state, column));
        }

        debug!(
            samples = n_s,
            states = output_states.len(),
            "allocated output buffer"
        );
        Ok(OutputBuffer::new(timeline.times(), columns))
    }
}
