//! Thermal runaway detection.
//!
//! Trips when the controller keeps demanding heat (error above threshold) but
//! the measured temperature has not moved by more than the threshold within
//! the timeout. Typical causes are an open heater, a detached sensor, or a tip
//! that is not seated.

use crate::config::RunawayCfg;
use crate::fixed_point::{abs_diff_i16, temp_to_i16};

/// Detector state. `faulted` never clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunawayState {
    pub reference_c: i16,
    pub reference_ms: u64,
    pub faulted: bool,
}

#[derive(Debug, Clone)]
pub struct ThermalRunawayDetector {
    threshold_c: i32,
    timeout_ms: u64,
    state: RunawayState,
}

impl ThermalRunawayDetector {
    pub fn new(cfg: &RunawayCfg) -> Self {
        Self {
            threshold_c: cfg.threshold_c,
            timeout_ms: cfg.timeout_ms,
            state: RunawayState::default(),
        }
    }

    /// Feed one cycle. Returns `true` only on the call that trips the fault.
    pub fn observe(&mut self, measured_c: i32, error_c: i32, now_ms: u64) -> bool {
        let measured = temp_to_i16(measured_c);
        if error_c <= self.threshold_c {
            self.rebase(measured, now_ms);
            return false;
        }
        if abs_diff_i16(measured, self.state.reference_c) > self.threshold_c {
            self.rebase(measured, now_ms);
            return false;
        }
        if !self.state.faulted && now_ms.saturating_sub(self.state.reference_ms) > self.timeout_ms
        {
            self.state.faulted = true;
            return true;
        }
        false
    }

    fn rebase(&mut self, measured: i16, now_ms: u64) {
        self.state.reference_c = measured;
        self.state.reference_ms = now_ms;
    }

    pub fn is_faulted(&self) -> bool {
        self.state.faulted
    }

    pub fn state(&self) -> RunawayState {
        self.state
    }
}
