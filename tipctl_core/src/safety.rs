//! Ordered overrides applied to the controller's raw power request.
//!
//! Stage order is fixed: keep-awake floor, ADC saturation cutoff, runaway
//! cutoff, power limit, supply limit, then the optional slew limit. Later
//! stages see the output of earlier ones, so the cutoffs always beat the
//! keep-awake floor.

use tipctl_traits::{SettingsOption, SettingsStore};

use crate::config::{KeepAwakeCfg, OutputCfg};
use crate::fixed_point::watts_to_x10;

/// Per-cycle snapshot of the user and supply limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyLimits {
    /// Keep-awake pulse power in x10W; 0 disables the pulse.
    pub keep_awake_pulse_x10w: i32,
    /// Pulse period in wait units.
    pub keep_awake_wait: i32,
    /// Pulse length in duration units.
    pub keep_awake_duration: i32,
    /// User power limit in watts; 0 disables.
    pub power_limit_w: i32,
    /// Supply limit in watts; 0 disables.
    pub supply_limit_w: i32,
}

impl SafetyLimits {
    pub fn snapshot(settings: &dyn SettingsStore, supply_limit_w: i32) -> Self {
        Self {
            keep_awake_pulse_x10w: settings.get(SettingsOption::KeepAwakePulse),
            keep_awake_wait: settings.get(SettingsOption::KeepAwakePulseWait),
            keep_awake_duration: settings.get(SettingsOption::KeepAwakePulseDuration),
            power_limit_w: settings.get(SettingsOption::PowerLimit),
            supply_limit_w,
        }
    }
}

/// Inputs observed this cycle besides the request itself.
#[derive(Debug, Clone, Copy)]
pub struct ChainInputs {
    pub now_ms: u64,
    /// Raw tip signal on channel 0; `None` when the read failed.
    pub raw_signal: Option<i32>,
    pub runaway_faulted: bool,
    pub limits: SafetyLimits,
}

/// Current or last keep-awake pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PulseWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

#[derive(Debug, Clone)]
pub struct OutputSafetyChain {
    keep_awake: KeepAwakeCfg,
    saturation_threshold: i32,
    slew_limit_x10w: Option<i32>,
    pulse: PulseWindow,
    last_issued_x10w: i32,
}

impl OutputSafetyChain {
    pub fn new(output: &OutputCfg, keep_awake: &KeepAwakeCfg) -> Self {
        Self {
            keep_awake: *keep_awake,
            saturation_threshold: output.saturation_threshold,
            slew_limit_x10w: output.slew_limit_x10w,
            pulse: PulseWindow::default(),
            last_issued_x10w: 0,
        }
    }

    /// Shape `raw_x10w` into the command to issue.
    pub fn apply(&mut self, raw_x10w: i32, inputs: &ChainInputs) -> i32 {
        let mut out = self.keep_awake_floor(raw_x10w, inputs.now_ms, &inputs.limits);

        // a failed raw read is treated like a pinned input
        let saturated = inputs
            .raw_signal
            .is_none_or(|raw| raw > self.saturation_threshold);
        if saturated {
            out = 0;
        }
        if inputs.runaway_faulted {
            out = 0;
        }
        out = cap_at_watts(out, inputs.limits.power_limit_w);
        out = cap_at_watts(out, inputs.limits.supply_limit_w);

        if let Some(step) = self.slew_limit_x10w {
            // Disables outside the chain (tick timeout, sensor fault) leave the last value as is.
            out = slew(out, self.last_issued_x10w, step);
            self.last_issued_x10w = out;
        }
        out
    }

    fn keep_awake_floor(&mut self, value: i32, now_ms: u64, limits: &SafetyLimits) -> i32 {
        let pulse = limits.keep_awake_pulse_x10w;
        if pulse == 0 {
            return value;
        }
        let wait_ms = self
            .keep_awake
            .wait_unit_ms
            .saturating_mul(units(limits.keep_awake_wait));
        if now_ms.saturating_sub(self.pulse.start_ms) > wait_ms {
            let duration_ms = self
                .keep_awake
                .duration_unit_ms
                .saturating_mul(units(limits.keep_awake_duration));
            self.pulse.start_ms = now_ms;
            self.pulse.end_ms = now_ms.saturating_add(duration_ms);
        }
        if now_ms < self.pulse.end_ms && value < pulse {
            pulse
        } else {
            value
        }
    }

    pub fn pulse_window(&self) -> PulseWindow {
        self.pulse
    }

    /// Last value issued through the slew stage (0 when slew is off).
    pub fn last_issued_x10w(&self) -> i32 {
        self.last_issued_x10w
    }
}

fn units(setting: i32) -> u64 {
    u64::try_from(setting).unwrap_or(0)
}

/// Cap `value` at `limit_w` watts when the limit is nonzero.
fn cap_at_watts(value: i32, limit_w: i32) -> i32 {
    if limit_w != 0 {
        let cap = watts_to_x10(limit_w);
        if value > cap {
            return cap;
        }
    }
    value
}

fn slew(value: i32, last: i32, step: i32) -> i32 {
    let mut out = value;
    if out.saturating_sub(last) > step {
        out = last.saturating_add(step);
    }
    out.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> OutputSafetyChain {
        OutputSafetyChain::new(&OutputCfg::default(), &KeepAwakeCfg::default())
    }

    fn inputs(now_ms: u64, limits: SafetyLimits) -> ChainInputs {
        ChainInputs {
            now_ms,
            raw_signal: Some(1000),
            runaway_faulted: false,
            limits,
        }
    }

    #[test]
    fn passthrough_without_limits() {
        let mut c = chain();
        assert_eq!(c.apply(1234, &inputs(0, SafetyLimits::default())), 1234);
        assert_eq!(c.apply(-40, &inputs(0, SafetyLimits::default())), -40);
    }

    #[test]
    fn keep_awake_pulse_window() {
        let limits = SafetyLimits {
            keep_awake_pulse_x10w: 50,
            keep_awake_wait: 2,
            keep_awake_duration: 1,
            ..SafetyLimits::default()
        };
        let mut c = chain();
        // window starts once now - 0 exceeds 5000 ms
        assert_eq!(c.apply(0, &inputs(5000, limits)), 0);
        assert_eq!(c.apply(0, &inputs(5001, limits)), 50);
        assert_eq!(
            c.pulse_window(),
            PulseWindow {
                start_ms: 5001,
                end_ms: 5251
            }
        );
        assert_eq!(c.apply(0, &inputs(5250, limits)), 50);
        assert_eq!(c.apply(0, &inputs(5251, limits)), 0);
        // larger requests pass untouched
        assert_eq!(c.apply(80, &inputs(5100, limits)), 80);
    }

    #[test]
    fn saturation_beats_keep_awake() {
        let limits = SafetyLimits {
            keep_awake_pulse_x10w: 50,
            keep_awake_duration: 4,
            ..SafetyLimits::default()
        };
        let mut c = chain();
        let mut i = inputs(10, limits);
        i.raw_signal = Some(0x7FFF);
        assert_eq!(c.apply(0, &i), 0);
        i.raw_signal = None;
        assert_eq!(c.apply(500, &i), 0);
        i.raw_signal = Some(0x7FFF - 32);
        assert_eq!(c.apply(0, &i), 50);
    }

    #[test]
    fn runaway_forces_zero() {
        let mut c = chain();
        let mut i = inputs(0, SafetyLimits::default());
        i.runaway_faulted = true;
        assert_eq!(c.apply(4000, &i), 0);
    }

    #[test]
    fn both_ceilings_apply() {
        let limits = SafetyLimits {
            power_limit_w: 40,
            supply_limit_w: 30,
            ..SafetyLimits::default()
        };
        let mut c = chain();
        assert_eq!(c.apply(2000, &inputs(0, limits)), 300);
        let limits = SafetyLimits {
            power_limit_w: 20,
            supply_limit_w: 30,
            ..SafetyLimits::default()
        };
        assert_eq!(c.apply(2000, &inputs(0, limits)), 200);
    }

    #[test]
    fn slew_limits_rise_and_floors_at_zero() {
        let output = OutputCfg {
            slew_limit_x10w: Some(100),
            ..OutputCfg::default()
        };
        let mut c = OutputSafetyChain::new(&output, &KeepAwakeCfg::default());
        let i = inputs(0, SafetyLimits::default());
        assert_eq!(c.apply(1000, &i), 100);
        assert_eq!(c.apply(1000, &i), 200);
        assert_eq!(c.apply(150, &i), 150);
        assert_eq!(c.apply(-500, &i), 0);
        assert_eq!(c.last_issued_x10w(), 0);
    }

    #[test]
    fn slew_resumes_from_last_shaped_value() {
        let output = OutputCfg {
            slew_limit_x10w: Some(100),
            ..OutputCfg::default()
        };
        let mut c = OutputSafetyChain::new(&output, &KeepAwakeCfg::default());
        let i = inputs(0, SafetyLimits::default());
        assert_eq!(c.apply(1000, &i), 100);
        assert_eq!(c.apply(1000, &i), 200);
        // cycles that cut the heater without passing through the chain
        assert_eq!(c.last_issued_x10w(), 200);
        assert_eq!(c.apply(1000, &i), 300);
    }
}
