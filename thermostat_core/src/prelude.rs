// thermostat_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::{EstimatorModel, InitRequest, Lifecycle, ModelRun, Settings};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::buffer::{CategoricalColumn, Column, OutputBuffer};
pub use crate::memory::StepMemory;
pub use crate::states::{CategoryTable, Dtype, NumericLayout, NumericStorage, StateTypeRegistry};
pub use crate::timeline::{Timeline, TimelineAllocator};
pub use crate::types::{SimTime, StateId, StepInput, StepStatus, Tick, Value};

// --- Errors ---
pub use crate::error::{AllocationError, BufferError, EstimatorError, TimelineError};

// --- Concrete Model Implementations ---
pub use crate::estimation::filters::LowPassFilter;
