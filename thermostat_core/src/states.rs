// thermostat_core/src/states.rs

//! The declarative description of which states exist and how they are stored.
//!
//! Nothing here is global: a registry and a category table are built by the
//! caller and handed to the allocator, so runs with different category sets
//! can live side by side.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AllocationError;
use crate::types::{StateId, Value};

/// The declared type of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Bool,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Category,
}

/// The concrete element type a numeric column is stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericStorage {
    Bool,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
}

impl NumericStorage {
    pub fn name(&self) -> &'static str {
        match self {
            NumericStorage::Bool => "bool",
            NumericStorage::Float32 => "float32",
            NumericStorage::Float64 => "float64",
            NumericStorage::Int8 => "int8",
            NumericStorage::Int16 => "int16",
            NumericStorage::Int32 => "int32",
            NumericStorage::Int64 => "int64",
        }
    }
}

/// How a numeric dtype is laid out in memory and what an unwritten element holds.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericLayout {
    pub storage: NumericStorage,
    pub fill: Value,
}

impl NumericLayout {
    /// The standard down-cast table. `float64` is narrowed to `f32` storage,
    /// floats start out as NaN, integers as zero and bools as `false`.
    pub fn down_cast(dtype: Dtype) -> Option<Self> {
        let (storage, fill) = match dtype {
            Dtype::Bool => (NumericStorage::Bool, Value::Bool(false)),
            Dtype::Float32 | Dtype::Float64 => (NumericStorage::Float32, Value::Float(f64::NAN)),
            Dtype::Int8 => (NumericStorage::Int8, Value::Int(0)),
            Dtype::Int16 => (NumericStorage::Int16, Value::Int(0)),
            Dtype::Int32 => (NumericStorage::Int32, Value::Int(0)),
            Dtype::Int64 => (NumericStorage::Int64, Value::Int(0)),
            Dtype::Category => return None,
        };
        Some(Self { storage, fill })
    }
}

/// Read-only map from state to declared dtype, plus the down-cast rules.
#[derive(Debug, Clone, Default)]
pub struct StateTypeRegistry {
    dtypes: HashMap<StateId, Dtype>,
    layout_overrides: HashMap<Dtype, NumericLayout>,
}

impl StateTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: StateId, dtype: Dtype) -> Self {
        self.dtypes.insert(state, dtype);
        self
    }

    /// Replaces the standard down-cast for one dtype. Ignored for `Category`.
    pub fn with_down_cast(mut self, dtype: Dtype, layout: NumericLayout) -> Self {
        if dtype != Dtype::Category {
            self.layout_overrides.insert(dtype, layout);
        }
        self
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.dtypes.contains_key(&state)
    }

    pub fn dtype(&self, state: StateId) -> Result<Dtype, AllocationError> {
        self.dtypes
            .get(&state)
            .copied()
            .ok_or(AllocationError::UnknownState(state))
    }

    /// Storage layout for a numeric dtype, `None` for categorical ones.
    pub fn layout(&self, dtype: Dtype) -> Option<NumericLayout> {
        self.layout_overrides
            .get(&dtype)
            .cloned()
            .or_else(|| NumericLayout::down_cast(dtype))
    }

    pub fn len(&self) -> usize {
        self.dtypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dtypes.is_empty()
    }
}

/// The concrete label set of every categorical state for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    labels: HashMap<StateId, Arc<[Arc<str>]>>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<I, S>(mut self, state: StateId, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(state, labels);
        self
    }

    pub fn insert<I, S>(&mut self, state: StateId, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Arc<[Arc<str>]> = labels
            .into_iter()
            .map(|label| Arc::from(label.as_ref()))
            .collect();
        self.labels.insert(state, labels);
    }

    pub fn labels(&self, state: StateId) -> Option<&Arc<[Arc<str>]>> {
        self.labels.get(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float64_is_down_cast_to_float32() {
        let registry = StateTypeRegistry::new();
        let layout = registry.layout(Dtype::Float64).unwrap();
        assert_eq!(layout.storage, NumericStorage::Float32);
        assert!(layout.fill.as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_category_has_no_numeric_layout() {
        assert!(StateTypeRegistry::new().layout(Dtype::Category).is_none());
    }

    #[test]
    fn test_override_replaces_standard_layout() {
        let registry = StateTypeRegistry::new().with_down_cast(
            Dtype::Float64,
            NumericLayout {
                storage: NumericStorage::Float64,
                fill: Value::Float(0.0),
            },
        );
        let layout = registry.layout(Dtype::Float64).unwrap();
        assert_eq!(layout.storage, NumericStorage::Float64);
        assert_eq!(layout.fill, Value::Float(0.0));
        // Other dtypes keep the standard table.
        assert_eq!(
            registry.layout(Dtype::Int16).unwrap().storage,
            NumericStorage::Int16
        );
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let registry = StateTypeRegistry::new().with_state(StateId::HvacMode, Dtype::Category);
        assert_eq!(registry.dtype(StateId::HvacMode), Ok(Dtype::Category));
        assert_eq!(
            registry.dtype(StateId::SystemMode),
            Err(AllocationError::UnknownState(StateId::SystemMode))
        );
    }
}
