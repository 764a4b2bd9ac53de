//! `From` implementations bridging `tipctl_config` types to `tipctl_core` types.

use tipctl_traits::SettingsOption;

use crate::config::{ControlCfg, KeepAwakeCfg, OutputCfg, RunawayCfg, Timeouts};
use crate::shared::{ControlHandle, LiveSettings};

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&tipctl_config::ControlCfg> for ControlCfg {
    fn from(c: &tipctl_config::ControlCfg) -> Self {
        Self {
            loop_hz: c.loop_hz,
            max_target_c: c.max_target_c,
            bias_c: c.bias_c,
            thermal_mass_x10j_per_c: c.thermal_mass_x10j_per_c,
            integral_gain: c.integral_gain,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&tipctl_config::Timeouts> for Timeouts {
    fn from(c: &tipctl_config::Timeouts) -> Self {
        Self {
            tick_ms: c.tick_ms,
            warmup_reads: c.warmup_reads,
            warmup_delay_ms: c.warmup_delay_ms,
        }
    }
}

// ── RunawayCfg ───────────────────────────────────────────────────────────────

impl From<&tipctl_config::RunawayCfg> for RunawayCfg {
    fn from(c: &tipctl_config::RunawayCfg) -> Self {
        Self {
            threshold_c: c.threshold_c,
            timeout_ms: c.timeout_ms,
        }
    }
}

// ── OutputCfg ────────────────────────────────────────────────────────────────

impl From<&tipctl_config::OutputCfg> for OutputCfg {
    fn from(c: &tipctl_config::OutputCfg) -> Self {
        Self {
            saturation_threshold: c.saturation_threshold,
            slew_limit_x10w: c.slew_limit_x10w,
            diagnostics: c.diagnostics,
        }
    }
}

// ── KeepAwakeCfg ─────────────────────────────────────────────────────────────

impl From<&tipctl_config::KeepAwakeCfg> for KeepAwakeCfg {
    fn from(c: &tipctl_config::KeepAwakeCfg) -> Self {
        Self {
            wait_unit_ms: c.wait_unit_ms,
            duration_unit_ms: c.duration_unit_ms,
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

impl From<&tipctl_config::SettingsCfg> for LiveSettings {
    fn from(c: &tipctl_config::SettingsCfg) -> Self {
        let s = LiveSettings::default();
        s.set(SettingsOption::PowerLimit, c.power_limit_w);
        s.set(SettingsOption::KeepAwakePulse, c.keep_awake_pulse_x10w);
        s.set(SettingsOption::KeepAwakePulseWait, c.keep_awake_wait);
        s.set(SettingsOption::KeepAwakePulseDuration, c.keep_awake_duration);
        s
    }
}

impl From<&tipctl_config::SettingsCfg> for ControlHandle {
    fn from(c: &tipctl_config::SettingsCfg) -> Self {
        let h = ControlHandle::new();
        h.set_supply_limit_w(c.supply_limit_w);
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tipctl_traits::SettingsStore;

    #[test]
    fn settings_section_seeds_store_and_handle() {
        let cfg = tipctl_config::SettingsCfg {
            power_limit_w: 60,
            keep_awake_pulse_x10w: 5,
            keep_awake_wait: 4,
            keep_awake_duration: 2,
            supply_limit_w: 45,
        };
        let store = LiveSettings::from(&cfg);
        assert_eq!(store.get(SettingsOption::PowerLimit), 60);
        assert_eq!(store.get(SettingsOption::KeepAwakePulse), 5);
        assert_eq!(store.get(SettingsOption::KeepAwakePulseWait), 4);
        assert_eq!(store.get(SettingsOption::KeepAwakePulseDuration), 2);
        assert_eq!(ControlHandle::from(&cfg).supply_limit_w(), 45);
    }

    #[test]
    fn output_section_keeps_optional_slew() {
        let cfg = tipctl_config::OutputCfg {
            slew_limit_x10w: Some(40),
            ..Default::default()
        };
        assert_eq!(OutputCfg::from(&cfg).slew_limit_x10w, Some(40));
    }
}
