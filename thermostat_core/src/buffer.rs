// thermostat_core/src/buffer.rs

//! Fixed-length, strongly typed storage for an entire simulation run.

use nalgebra::DVector;
use num_traits::NumCast;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BufferError;
use crate::states::{NumericLayout, NumericStorage};
use crate::types::{SimTime, StateId, StepStatus, Tick, Value};

/// Per-tick storage for one categorical state.
///
/// Elements are indices into a label set fixed at allocation; `None` marks a
/// tick that has not been written.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalColumn {
    labels: Arc<[Arc<str>]>,
    codes: Vec<Option<u16>>,
}

impl CategoricalColumn {
    pub fn new(labels: Arc<[Arc<str>]>, len: usize) -> Self {
        Self {
            labels,
            codes: vec![None; len],
        }
    }

    pub fn labels(&self) -> &[Arc<str>] {
        &self.labels
    }

    pub fn codes(&self) -> &[Option<u16>] {
        &self.codes
    }

    /// The label stored at `tick`, `None` if the tick is unwritten or out of range.
    pub fn label_at(&self, tick: Tick) -> Option<&str> {
        let code = (*self.codes.get(tick)?)?;
        self.labels.get(code as usize).map(|label| label.as_ref())
    }

    fn code_of(&self, label: &str) -> Option<u16> {
        self.labels
            .iter()
            .position(|l| l.as_ref() == label)
            .map(|idx| idx as u16)
    }
}

/// One output series. The variant is decided once, at allocation, and every
/// write is checked against it.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Bool(DVector<bool>),
    Float32(DVector<f32>),
    Float64(DVector<f64>),
    Int8(DVector<i8>),
    Int16(DVector<i16>),
    Int32(DVector<i32>),
    Int64(DVector<i64>),
    Categorical(CategoricalColumn),
}

/// A value already converted to a column's element type.
enum Encoded {
    Bool(bool),
    Float32(f32),
    Float64(f64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Code(u16),
}

fn cast_int<T: NumCast>(state: StateId, width: &'static str, value: i64) -> Result<T, BufferError> {
    <T as NumCast>::from(value).ok_or(BufferError::OutOfRange {
        state,
        width,
        value,
    })
}

impl Column {
    /// A numeric column of `len` elements, every one set to the layout's fill value.
    pub fn numeric(state: StateId, layout: &NumericLayout, len: usize) -> Result<Self, BufferError> {
        let mut column = match layout.storage {
            NumericStorage::Bool => Column::Bool(DVector::from_element(len, false)),
            NumericStorage::Float32 => Column::Float32(DVector::zeros(len)),
            NumericStorage::Float64 => Column::Float64(DVector::zeros(len)),
            NumericStorage::Int8 => Column::Int8(DVector::zeros(len)),
            NumericStorage::Int16 => Column::Int16(DVector::zeros(len)),
            NumericStorage::Int32 => Column::Int32(DVector::zeros(len)),
            NumericStorage::Int64 => Column::Int64(DVector::zeros(len)),
        };
        let fill = column.encode(state, &layout.fill)?;
        for tick in 0..len {
            column.store(tick, &fill);
        }
        Ok(column)
    }

    pub fn categorical(labels: Arc<[Arc<str>]>, len: usize) -> Self {
        Column::Categorical(CategoricalColumn::new(labels, len))
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Int8(v) => v.len(),
            Column::Int16(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Categorical(c) => c.codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn storage_name(&self) -> &'static str {
        match self {
            Column::Bool(_) => "bool",
            Column::Float32(_) => "float32",
            Column::Float64(_) => "float64",
            Column::Int8(_) => "int8",
            Column::Int16(_) => "int16",
            Column::Int32(_) => "int32",
            Column::Int64(_) => "int64",
            Column::Categorical(_) => "category",
        }
    }

    /// Reads one element back as a [`Value`]. Unwritten categorical ticks read as `None`.
    pub fn value_at(&self, tick: Tick) -> Option<Value> {
        if tick >= self.len() {
            return None;
        }
        let value = match self {
            Column::Bool(v) => Value::Bool(v[tick]),
            Column::Float32(v) => Value::Float(v[tick] as f64),
            Column::Float64(v) => Value::Float(v[tick]),
            Column::Int8(v) => Value::Int(v[tick] as i64),
            Column::Int16(v) => Value::Int(v[tick] as i64),
            Column::Int32(v) => Value::Int(v[tick] as i64),
            Column::Int64(v) => Value::Int(v[tick]),
            Column::Categorical(c) => Value::Label(c.labels[(c.codes[tick]?) as usize].clone()),
        };
        Some(value)
    }

    pub fn as_bool(&self) -> Option<&DVector<bool>> {
        match self {
            Column::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float32(&self) -> Option<&DVector<f32>> {
        match self {
            Column::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<&DVector<f64>> {
        match self {
            Column::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalColumn> {
        match self {
            Column::Categorical(c) => Some(c),
            _ => None,
        }
    }

    /// Checks that `value` can be written to this column without writing it.
    pub fn check(&self, state: StateId, value: &Value) -> Result<(), BufferError> {
        self.encode(state, value).map(|_| ())
    }

    pub fn write(&mut self, state: StateId, tick: Tick, value: &Value) -> Result<(), BufferError> {
        let len = self.len();
        if tick >= len {
            return Err(BufferError::IndexOutOfBounds { index: tick, len });
        }
        let encoded = self.encode(state, value)?;
        self.store(tick, &encoded);
        Ok(())
    }

    fn encode(&self, state: StateId, value: &Value) -> Result<Encoded, BufferError> {
        let mismatch = || BufferError::TypeMismatch {
            state,
            expected: self.storage_name(),
            found: value.kind(),
        };
        let encoded = match (self, value) {
            (Column::Bool(_), Value::Bool(v)) => Encoded::Bool(*v),
            (Column::Float32(_), Value::Float(v)) => Encoded::Float32(*v as f32),
            (Column::Float32(_), Value::Int(v)) => Encoded::Float32(*v as f32),
            (Column::Float64(_), Value::Float(v)) => Encoded::Float64(*v),
            (Column::Float64(_), Value::Int(v)) => Encoded::Float64(*v as f64),
            (Column::Int8(_), Value::Int(v)) => Encoded::Int8(cast_int(state, "int8", *v)?),
            (Column::Int16(_), Value::Int(v)) => Encoded::Int16(cast_int(state, "int16", *v)?),
            (Column::Int32(_), Value::Int(v)) => Encoded::Int32(cast_int(state, "int32", *v)?),
            (Column::Int64(_), Value::Int(v)) => Encoded::Int64(*v),
            (Column::Categorical(c), Value::Label(label)) => {
                let code = c.code_of(label).ok_or_else(|| BufferError::UnknownCategory {
                    state,
                    label: label.to_string(),
                })?;
                Encoded::Code(code)
            }
            _ => return Err(mismatch()),
        };
        Ok(encoded)
    }

    fn store(&mut self, tick: Tick, encoded: &Encoded) {
        match (self, encoded) {
            (Column::Bool(v), Encoded::Bool(x)) => v[tick] = *x,
            (Column::Float32(v), Encoded::Float32(x)) => v[tick] = *x,
            (Column::Float64(v), Encoded::Float64(x)) => v[tick] = *x,
            (Column::Int8(v), Encoded::Int8(x)) => v[tick] = *x,
            (Column::Int16(v), Encoded::Int16(x)) => v[tick] = *x,
            (Column::Int32(v), Encoded::Int32(x)) => v[tick] = *x,
            (Column::Int64(v), Encoded::Int64(x)) => v[tick] = *x,
            (Column::Categorical(c), Encoded::Code(x)) => c.codes[tick] = Some(*x),
            // `encode` only ever produces the variant matching its column.
            _ => unreachable!("encoded value does not match its column"),
        }
    }
}

/// The preallocated output of one simulation run: the time axis, the step
/// status series and one [`Column`] per output state, all of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBuffer {
    simulation_time: DVector<SimTime>,
    step_status: DVector<i8>,
    columns: HashMap<StateId, Column>,
    /// Declaration order of the output states.
    order: Vec<StateId>,
}

impl OutputBuffer {
    pub(crate) fn new(simulation_time: DVector<SimTime>, columns: Vec<(StateId, Column)>) -> Self {
        let len = simulation_time.len();
        let order = columns.iter().map(|(state, _)| *state).collect();
        Self {
            simulation_time,
            step_status: DVector::zeros(len),
            columns: columns.into_iter().collect(),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.simulation_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulation_time.is_empty()
    }

    pub fn simulation_time(&self) -> &DVector<SimTime> {
        &self.simulation_time
    }

    pub fn step_status(&self) -> &DVector<i8> {
        &self.step_status
    }

    pub fn states(&self) -> &[StateId] {
        &self.order
    }

    pub fn column(&self, state: StateId) -> Option<&Column> {
        self.columns.get(&state)
    }

    /// Reads any series, the reserved ones included, at `tick`.
    pub fn value(&self, state: StateId, tick: Tick) -> Option<Value> {
        match state {
            StateId::SimulationTime => self.simulation_time.get(tick).map(|t| Value::Int(*t)),
            StateId::StepStatus => self.step_status.get(tick).map(|s| Value::Int(*s as i64)),
            _ => self.columns.get(&state)?.value_at(tick),
        }
    }

    pub fn check(&self, state: StateId, value: &Value) -> Result<(), BufferError> {
        self.columns
            .get(&state)
            .ok_or(BufferError::UnknownState(state))?
            .check(state, value)
    }

    pub fn write(&mut self, state: StateId, tick: Tick, value: &Value) -> Result<(), BufferError> {
        self.columns
            .get_mut(&state)
            .ok_or(BufferError::UnknownState(state))?
            .write(state, tick, value)
    }

    pub fn set_status(&mut self, tick: Tick, status: StepStatus) -> Result<(), BufferError> {
        let len = self.len();
        let slot = self
            .step_status
            .get_mut(tick)
            .ok_or(BufferError::IndexOutOfBounds { index: tick, len })?;
        *slot = status.code();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Arc<[Arc<str>]> {
        items.iter().map(|s| Arc::from(*s)).collect()
    }

    #[test]
    fn test_numeric_column_is_filled_with_layout_default() {
        let layout = NumericLayout::down_cast(crate::states::Dtype::Int16).unwrap();
        let column = Column::numeric(StateId::AuxiliaryHeatStage, &layout, 4).unwrap();
        assert_eq!(column.len(), 4);
        assert_eq!(column.value_at(3), Some(Value::Int(0)));
        assert_eq!(column.value_at(4), None);
    }

    #[test]
    fn test_write_rejects_wrong_variant() {
        let mut column = Column::Bool(DVector::from_element(2, false));
        let err = column
            .write(StateId::ThermostatMotionEstimate, 0, &Value::Float(1.0))
            .unwrap_err();
        assert_eq!(
            err,
            BufferError::TypeMismatch {
                state: StateId::ThermostatMotionEstimate,
                expected: "bool",
                found: "float",
            }
        );
    }

    #[test]
    fn test_integer_write_is_range_checked() {
        let mut column = Column::Int8(DVector::zeros(1));
        assert!(column.write(StateId::AuxiliaryHeatStage, 0, &Value::Int(3)).is_ok());
        assert_eq!(
            column.write(StateId::AuxiliaryHeatStage, 0, &Value::Int(300)),
            Err(BufferError::OutOfRange {
                state: StateId::AuxiliaryHeatStage,
                width: "int8",
                value: 300,
            })
        );
        assert_eq!(column.value_at(0), Some(Value::Int(3)));
    }

    #[test]
    fn test_categorical_column_starts_missing_and_enforces_labels() {
        let mut column = Column::categorical(labels(&["heat", "cool", "off"]), 3);
        assert_eq!(column.value_at(0), None);

        column
            .write(StateId::HvacMode, 1, &Value::from("cool"))
            .unwrap();
        assert_eq!(column.as_categorical().unwrap().label_at(1), Some("cool"));

        let err = column
            .write(StateId::HvacMode, 2, &Value::from("fan"))
            .unwrap_err();
        assert_eq!(
            err,
            BufferError::UnknownCategory {
                state: StateId::HvacMode,
                label: "fan".to_string(),
            }
        );
        assert_eq!(column.value_at(2), None);
    }

    #[test]
    fn test_write_past_end_is_out_of_bounds() {
        let mut column = Column::Float32(DVector::zeros(2));
        assert_eq!(
            column.write(StateId::ThermostatTemperatureEstimate, 2, &Value::Float(1.0)),
            Err(BufferError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }
}
