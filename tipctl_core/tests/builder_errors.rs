mod common;

use common::{EventLog, LogHeater, LogWatchdog, ScriptedSensor};
use rstest::rstest;
use tipctl_core::{
    BuildError, ControlCfg, ControlLoop, OutputCfg, RunawayCfg, Timeouts, tick_channel,
};

fn err_of(r: tipctl_core::Result<ControlLoop>) -> BuildError {
    let e = r.expect_err("expected build error");
    e.downcast_ref::<BuildError>()
        .cloned()
        .unwrap_or_else(|| panic!("not a BuildError: {e:?}"))
}

#[test]
fn missing_sensor_is_reported() {
    let log = EventLog::default();
    let r = ControlLoop::builder()
        .with_heater(LogHeater(log.clone()))
        .with_watchdog(LogWatchdog(log))
        .try_build();
    assert_eq!(err_of(r), BuildError::MissingSensor);
}

#[test]
fn missing_heater_is_reported() {
    let r = ControlLoop::builder()
        .with_sensor(ScriptedSensor::new(25))
        .try_build();
    assert_eq!(err_of(r), BuildError::MissingHeater);
}

#[test]
fn missing_watchdog_is_reported() {
    let r = ControlLoop::builder()
        .with_sensor(ScriptedSensor::new(25))
        .with_heater(LogHeater(EventLog::default()))
        .try_build();
    assert_eq!(err_of(r), BuildError::MissingWatchdog);
}

#[test]
fn missing_tick_source_is_reported() {
    let log = EventLog::default();
    let r = ControlLoop::builder()
        .with_sensor(ScriptedSensor::new(25))
        .with_heater(LogHeater(log.clone()))
        .with_watchdog(LogWatchdog(log))
        .build();
    assert_eq!(err_of(r), BuildError::MissingTicks);
}

#[derive(Debug, Clone, Copy)]
enum Bad {
    LoopHz,
    ThermalMass,
    IntegralGain,
    TickMs,
    Threshold,
    Slew,
}

#[rstest]
#[case(Bad::LoopHz, "loop_hz")]
#[case(Bad::ThermalMass, "thermal_mass")]
#[case(Bad::IntegralGain, "integral_gain")]
#[case(Bad::TickMs, "tick_ms")]
#[case(Bad::Threshold, "threshold_c")]
#[case(Bad::Slew, "slew_limit")]
fn invalid_config_is_rejected(#[case] bad: Bad, #[case] needle: &str) {
    let log = EventLog::default();
    let (_n, w) = tick_channel();
    let mut control = ControlCfg::default();
    let mut timeouts = Timeouts::default();
    let mut runaway = RunawayCfg::default();
    let mut output = OutputCfg::default();
    match bad {
        Bad::LoopHz => control.loop_hz = 0,
        Bad::ThermalMass => control.thermal_mass_x10j_per_c = 0,
        Bad::IntegralGain => control.integral_gain = -1,
        Bad::TickMs => timeouts.tick_ms = 0,
        Bad::Threshold => runaway.threshold_c = 0,
        Bad::Slew => output.slew_limit_x10w = Some(0),
    }
    let r = ControlLoop::builder()
        .with_sensor(ScriptedSensor::new(25))
        .with_heater(LogHeater(log.clone()))
        .with_watchdog(LogWatchdog(log))
        .with_ticks(w)
        .with_control(control)
        .with_timeouts(timeouts)
        .with_runaway(runaway)
        .with_output(output)
        .build();
    match err_of(r) {
        BuildError::InvalidConfig(msg) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn generic_build_uses_same_validation() {
    let log = EventLog::default();
    let (_n, w) = tick_channel();
    let parts = tipctl_core::LoopParts {
        timeouts: Timeouts {
            tick_ms: 0,
            ..Timeouts::default()
        },
        ..Default::default()
    };
    let r = tipctl_core::build_control_loop(
        ScriptedSensor::new(25),
        LogHeater(log.clone()),
        LogWatchdog(log),
        w,
        parts,
    );
    assert!(r.is_err());
}
