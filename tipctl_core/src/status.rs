//! Per-cycle outcome and telemetry of the control loop.

use crate::error::ControlError;

/// Controller and output state of one processed cycle. Powers are x10W.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Effective set point; 0 when idle.
    pub target_c: i32,
    pub measured_c: i32,
    pub error_c: i32,
    pub proportional_x10w: i32,
    pub integral_x10w: i32,
    /// Controller request before the safety chain.
    pub requested_x10w: i32,
    /// Command handed to the heater.
    pub issued_x10w: i32,
    pub thermal_runaway: bool,
}

/// What one call to `run_cycle` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Tick received, pipeline ran, command issued, watchdog fed.
    Issued(CycleReport),
    /// No tick in time: output disabled, watchdog not fed.
    TickTimeout,
    /// Tick received but the temperature read failed: output disabled,
    /// watchdog not fed.
    SensorFault(ControlError),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Issued(r) => Some(r),
            _ => None,
        }
    }
}

/// Running counters since the loop was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub cycles: u64,
    pub issued: u64,
    pub tick_timeouts: u64,
    pub sensor_faults: u64,
    pub watchdog_feeds: u64,
}
