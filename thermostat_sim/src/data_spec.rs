// thermostat_sim/src/data_spec.rs

//! The thermostat data specification: the dtype of every state the pipeline
//! knows about, and the default label sets of its categorical states.

use thermostat_core::states::{CategoryTable, Dtype, StateTypeRegistry};
use thermostat_core::types::StateId;

pub const HVAC_MODES: [&str; 4] = ["heat", "cool", "auto", "off"];

pub const SYSTEM_MODES: [&str; 6] = [
    "heat_stage_1",
    "heat_stage_2",
    "cool_stage_1",
    "cool_stage_2",
    "fan",
    "off",
];

pub const CALENDAR_EVENTS: [&str; 5] = ["home", "away", "sleep", "vacation", "smart_away"];

/// Registry covering every [`StateId`] used by the thermostat pipeline.
pub fn thermostat_registry() -> StateTypeRegistry {
    StateTypeRegistry::new()
        .with_state(StateId::ThermostatTemperature, Dtype::Float32)
        .with_state(StateId::ThermostatHumidity, Dtype::Float32)
        .with_state(StateId::ThermostatMotion, Dtype::Bool)
        .with_state(StateId::ThermostatTemperatureEstimate, Dtype::Float64)
        .with_state(StateId::ThermostatHumidityEstimate, Dtype::Float64)
        .with_state(StateId::ThermostatMotionEstimate, Dtype::Bool)
        .with_state(StateId::TemperatureCtrl, Dtype::Float32)
        .with_state(StateId::HvacMode, Dtype::Category)
        .with_state(StateId::SystemMode, Dtype::Category)
        .with_state(StateId::CalendarEvent, Dtype::Category)
        .with_state(StateId::AuxiliaryHeatStage, Dtype::Int8)
}

pub fn default_categories() -> CategoryTable {
    CategoryTable::new()
        .with_labels(StateId::HvacMode, HVAC_MODES)
        .with_labels(StateId::SystemMode, SYSTEM_MODES)
        .with_labels(StateId::CalendarEvent, CALENDAR_EVENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_categorical_state_has_default_labels() {
        let registry = thermostat_registry();
        let categories = default_categories();
        for state in [StateId::HvacMode, StateId::SystemMode, StateId::CalendarEvent] {
            assert_eq!(registry.dtype(state), Ok(Dtype::Category));
            assert!(!categories.labels(state).unwrap().is_empty());
        }
    }

    #[test]
    fn test_reserved_states_are_not_registered() {
        let registry = thermostat_registry();
        assert!(!registry.contains(StateId::SimulationTime));
        assert!(!registry.contains(StateId::StepStatus));
    }
}
