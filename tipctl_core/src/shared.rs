//! Process-wide scalars shared between the control loop and the rest of the
//! system.
//!
//! Every field has exactly one writer. Readers take a snapshot once per cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use tipctl_traits::{SettingsOption, SettingsStore};

#[derive(Debug, Default)]
struct Shared {
    target_c: AtomicU32,
    supply_limit_w: AtomicI32,
    thermal_runaway: AtomicBool,
}

/// Cloneable handle to the loop's shared state.
///
/// The UI side writes the set point and the power-source side writes the
/// supply limit; only the control loop latches the runaway flag.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    inner: Arc<Shared>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested tip temperature in °C; 0 means heater off.
    pub fn set_target_c(&self, target_c: u32) {
        self.inner.target_c.store(target_c, Ordering::Relaxed);
    }

    pub fn target_c(&self) -> u32 {
        self.inner.target_c.load(Ordering::Relaxed)
    }

    /// Supply wattage ceiling in whole watts; 0 disables the limit.
    pub fn set_supply_limit_w(&self, watts: i32) {
        self.inner.supply_limit_w.store(watts, Ordering::Relaxed);
    }

    pub fn supply_limit_w(&self) -> i32 {
        self.inner.supply_limit_w.load(Ordering::Relaxed)
    }

    /// True once the loop has declared thermal runaway. Never clears.
    pub fn thermal_runaway(&self) -> bool {
        self.inner.thermal_runaway.load(Ordering::Acquire)
    }

    pub(crate) fn latch_thermal_runaway(&self) {
        self.inner.thermal_runaway.store(true, Ordering::Release);
    }
}

/// In-memory settings store backed by atomics.
///
/// Values may be changed while the loop runs; the loop reads them every cycle.
#[derive(Debug, Default)]
pub struct LiveSettings {
    keep_awake_pulse: AtomicI32,
    keep_awake_wait: AtomicI32,
    keep_awake_duration: AtomicI32,
    power_limit: AtomicI32,
}

impl LiveSettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, option: SettingsOption) -> &AtomicI32 {
        match option {
            SettingsOption::KeepAwakePulse => &self.keep_awake_pulse,
            SettingsOption::KeepAwakePulseWait => &self.keep_awake_wait,
            SettingsOption::KeepAwakePulseDuration => &self.keep_awake_duration,
            SettingsOption::PowerLimit => &self.power_limit,
        }
    }

    pub fn set(&self, option: SettingsOption, value: i32) {
        self.slot(option).store(value, Ordering::Relaxed);
    }
}

impl SettingsStore for LiveSettings {
    fn get(&self, option: SettingsOption) -> i32 {
        self.slot(option).load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = ControlHandle::new();
        let b = a.clone();
        a.set_target_c(320);
        a.set_supply_limit_w(45);
        assert_eq!(b.target_c(), 320);
        assert_eq!(b.supply_limit_w(), 45);
        assert!(!b.thermal_runaway());
        a.latch_thermal_runaway();
        assert!(b.thermal_runaway());
    }

    #[test]
    fn settings_round_trip_per_option() {
        let s = LiveSettings::new();
        s.set(SettingsOption::PowerLimit, 60);
        s.set(SettingsOption::KeepAwakePulse, 5);
        assert_eq!(s.get(SettingsOption::PowerLimit), 60);
        assert_eq!(s.get(SettingsOption::KeepAwakePulse), 5);
        assert_eq!(s.get(SettingsOption::KeepAwakePulseWait), 0);
    }
}
