// thermostat_sim/tests/simulation_run.rs

use approx::assert_relative_eq;
use chrono_tz::Tz;
use std::cell::Cell;
use std::sync::{Arc, Mutex};

use thermostat_sim::prelude::*;

/// Resolver that always answers Toronto and counts its lookups.
#[derive(Debug, Default)]
struct FixedResolver {
    calls: Cell<usize>,
}

impl TimezoneResolver for FixedResolver {
    fn resolve(&self, _latitude: f64, _longitude: f64) -> Result<Tz, TimezoneError> {
        self.calls.set(self.calls.get() + 1);
        Ok(chrono_tz::America::Toronto)
    }
}

const CONFIG: &str = r#"
    [simulation]
    t_start = 0
    t_end = 900
    t_step = 300
    start_utc = "2019-03-01T12:00:00Z"

    [location]
    latitude = 43.65
    longitude = -79.38

    [estimator]
    model = "low_pass"
    alpha_temperature = 0.5
"#;

fn sensor(temperature: f64, humidity: f64, motion: bool) -> StepInput {
    StepInput::new()
        .with(StateId::ThermostatTemperature, temperature)
        .with(StateId::ThermostatHumidity, humidity)
        .with(StateId::ThermostatMotion, motion)
}

fn simulator(toml: &str) -> Simulator<FixedResolver> {
    let config = SimulationConfig::from_toml_str(toml).unwrap();
    Simulator::with_resolver(config, FixedResolver::default()).unwrap()
}

fn estimate(output: &OutputBuffer, state: StateId, tick: Tick) -> f64 {
    output.value(state, tick).and_then(|v| v.as_f64()).unwrap()
}

#[test]
fn test_low_pass_run_smooths_temperature() {
    let sim = simulator(CONFIG);
    let inputs = vec![
        sensor(20.0, 40.0, false),
        sensor(22.0, 50.0, true),
        sensor(22.0, 50.0, true),
        sensor(22.0, 45.0, false),
    ];

    let report = sim.run(inputs).unwrap();
    let output = &report.output;

    assert_eq!(report.model_name, "LowPass");
    assert_eq!(report.steps, 4);
    assert_eq!(report.failures, 0);
    assert_eq!(output.simulation_time().as_slice(), &[0, 300, 600, 900]);
    assert!(output.step_status().iter().all(|s| *s == 0));

    let temperature = StateId::ThermostatTemperatureEstimate;
    assert_relative_eq!(estimate(output, temperature, 0), 20.0);
    assert_relative_eq!(estimate(output, temperature, 1), 21.0);
    assert_relative_eq!(estimate(output, temperature, 2), 21.5);
    assert_relative_eq!(estimate(output, temperature, 3), 21.75);

    // Humidity keeps its default coefficient of 1.0 and follows the sensor.
    assert_relative_eq!(estimate(output, StateId::ThermostatHumidityEstimate, 3), 45.0);
    assert_eq!(
        output.value(StateId::ThermostatMotionEstimate, 1),
        Some(Value::Bool(true))
    );
}

#[test]
fn test_report_carries_local_start_time() {
    let sim = simulator(CONFIG);
    let report = sim.run(vec![sensor(20.0, 40.0, false)]).unwrap();

    assert_eq!(report.timezone, Some(chrono_tz::America::Toronto));
    let local = report.local_start.unwrap();
    assert_eq!(local.naive_local().to_string(), "2019-03-01 07:00:00");
}

#[test]
fn test_timezone_is_resolved_once_across_runs() {
    let sim = simulator(CONFIG);
    sim.run(vec![sensor(20.0, 40.0, false)]).unwrap();
    sim.run(vec![sensor(21.0, 40.0, false)]).unwrap();
    assert_eq!(sim.channel().resolver().calls.get(), 1);
}

#[test]
fn test_runs_do_not_share_state() {
    let sim = simulator(CONFIG);
    sim.run(vec![sensor(10.0, 40.0, false)]).unwrap();

    // A second run starts cold instead of smoothing from the first run's estimate.
    let report = sim.run(vec![sensor(30.0, 40.0, false)]).unwrap();
    assert_relative_eq!(
        estimate(&report.output, StateId::ThermostatTemperatureEstimate, 0),
        30.0
    );
}

#[test]
fn test_extra_inputs_are_ignored() {
    let sim = simulator(CONFIG);
    let inputs = (0..6).map(|i| sensor(20.0 + i as f64, 40.0, false));

    let report = sim.run(inputs).unwrap();
    assert_eq!(report.steps, 4);
    assert_eq!(report.output.len(), 4);
}

#[test]
fn test_short_input_leaves_tail_unwritten() {
    let sim = simulator(CONFIG);
    let report = sim
        .run(vec![sensor(20.0, 40.0, false), sensor(20.0, 40.0, false)])
        .unwrap();

    assert_eq!(report.steps, 2);
    assert!(estimate(&report.output, StateId::ThermostatTemperatureEstimate, 2).is_nan());
}

#[test]
fn test_missing_sensor_aborts_run() {
    let sim = simulator(CONFIG);
    let incomplete = StepInput::new().with(StateId::ThermostatTemperature, 20.0);

    let err = sim.run(vec![incomplete]).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Estimator(EstimatorError::MissingInput(StateId::ThermostatHumidity))
            | SimulationError::Estimator(EstimatorError::MissingInput(StateId::ThermostatMotion))
    ));
}

#[test]
fn test_oversized_timeline_fails_before_running() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [simulation]
        t_end = 9223372036854775806
        t_step = 1
        start_utc = "2019-03-01T12:00:00Z"
        "#,
    )
    .unwrap();

    let result = Simulator::with_resolver(config, FixedResolver::default());
    assert!(matches!(
        result,
        Err(SimulationError::Timeline(TimelineError::TooManySamples { .. }))
    ));
}

#[test]
fn test_missing_location_runs_without_timezone() {
    let sim = simulator(
        r#"
        [simulation]
        t_end = 300
        t_step = 300
        start_utc = "2019-03-01T12:00:00Z"
        "#,
    );
    let report = sim.run(vec![sensor(20.0, 40.0, false)]).unwrap();

    assert_eq!(report.timezone, None);
    assert_eq!(report.local_start, None);
    assert_eq!(sim.channel().resolver().calls.get(), 0);
}

// --- A scripted model for exercising the simulator's failure handling ---

/// Writes the auxiliary heat stage, fails on the ticks listed in `fail_on`
/// and records every settings change together with the tick it arrived at.
#[derive(Debug, Clone)]
struct ScriptedModel {
    fail_on: Vec<Tick>,
    received: Arc<Mutex<Vec<(Tick, Settings)>>>,
    run: ModelRun,
}

const SCRIPTED_OUTPUTS: [StateId; 1] = [StateId::AuxiliaryHeatStage];

impl ScriptedModel {
    fn new(fail_on: Vec<Tick>) -> Self {
        Self {
            fail_on,
            received: Arc::default(),
            run: ModelRun::new(&SCRIPTED_OUTPUTS),
        }
    }
}

impl EstimatorModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "Scripted"
    }

    fn input_states(&self) -> &[StateId] {
        &[]
    }

    fn output_states(&self) -> &[StateId] {
        &SCRIPTED_OUTPUTS
    }

    fn initialize(&mut self, request: &InitRequest<'_>) -> Result<(), EstimatorError> {
        self.run.initialize(request, "Scripted")
    }

    fn do_step(
        &mut self,
        _t_start: SimTime,
        _t_step: SimTime,
        step_input: &StepInput,
    ) -> Result<StepStatus, EstimatorError> {
        let tick = self.run.begin_step(step_input, &[])?;
        let status = if self.fail_on.contains(&tick) {
            StepStatus(2)
        } else {
            StepStatus::SUCCESS
        };
        self.run
            .commit(&[(StateId::AuxiliaryHeatStage, Value::Int(tick as i64))], status)
    }

    fn tear_down(&mut self) -> Result<(), EstimatorError> {
        self.run.tear_down("Scripted")
    }

    fn change_settings(&mut self, new_settings: &Settings) -> Result<(), EstimatorError> {
        self.received
            .lock()
            .unwrap()
            .push((self.run.tick(), new_settings.clone()));
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

fn scripted_config(policy: &str) -> String {
    format!(
        r#"
        [simulation]
        t_end = 1200
        t_step = 300
        start_utc = "2019-03-01T12:00:00Z"
        on_step_failure = "{policy}"

        [[settings_changes]]
        at = 600
        settings = {{ deadband = 2.0 }}

        [[settings_changes]]
        at = 0
        settings = {{ schedule = "home" }}
        "#
    )
}

#[test]
fn test_step_failure_aborts_by_policy() {
    let sim = simulator(&scripted_config("abort")).with_model(Box::new(ScriptedModel::new(vec![1])));
    let err = sim.run((0..5).map(|_| StepInput::new())).unwrap_err();

    assert!(matches!(err, SimulationError::StepFailed { tick: 1, status: 2 }));
}

#[test]
fn test_step_failure_continues_by_policy() {
    let sim =
        simulator(&scripted_config("continue")).with_model(Box::new(ScriptedModel::new(vec![1, 3])));
    let report = sim.run((0..5).map(|_| StepInput::new())).unwrap();

    assert_eq!(report.steps, 5);
    assert_eq!(report.failures, 2);
    assert_eq!(report.output.step_status().as_slice(), &[0, 2, 0, 2, 0]);
    assert_eq!(
        report.output.value(StateId::AuxiliaryHeatStage, 4),
        Some(Value::Int(4))
    );
}

#[test]
fn test_settings_changes_apply_in_time_order() {
    let model = ScriptedModel::new(vec![]);
    let received = Arc::clone(&model.received);
    let sim = simulator(&scripted_config("abort")).with_model(Box::new(model));

    sim.run((0..5).map(|_| StepInput::new())).unwrap();

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 2);
    // The change at t = 0 lands before tick 0, the one at t = 600 before tick 2.
    assert_eq!(received[0].0, 0);
    assert_eq!(received[0].1.get("schedule"), Some(&Value::from("home")));
    assert_eq!(received[1].0, 2);
    assert_eq!(received[1].1.get("deadband"), Some(&Value::Float(2.0)));
}
