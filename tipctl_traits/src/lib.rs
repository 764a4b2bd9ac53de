//! Hardware seams for the tip controller.
//!
//! The control loop only talks to the outside world through these traits, so
//! the same loop drives real hardware, the simulator, and test doubles.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Source of tip temperature readings and the raw thermocouple signal.
pub trait TipSensor {
    /// Tip temperature in whole °C. `filtered` selects the smoothed reading.
    fn tip_temp_c(
        &mut self,
        filtered: bool,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;

    /// Highest temperature the fitted tip can be measured at, in °C.
    fn max_tip_temp_c(&self) -> i32;

    /// Raw ADC counts for `channel` (0 is the tip thermocouple).
    fn raw_tip_signal(
        &mut self,
        channel: u8,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>>;
}

/// Heater output driver.
pub trait Heater {
    /// Request a heater power in tenths of a watt. Negative values mean "off".
    fn set_x10_watts(
        &mut self,
        x10_watts: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Switch the PWM output off directly, bypassing the power conversion.
    fn disable_output(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Liveness sink; feeding it proves the control loop is still cycling.
pub trait Watchdog {
    fn feed(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// User settings consulted by the output stage every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsOption {
    /// Keep-awake pulse power in x10W; 0 disables the pulse.
    KeepAwakePulse,
    /// Pause between pulses, in 2.5 s units.
    KeepAwakePulseWait,
    /// Pulse length, in 250 ms units.
    KeepAwakePulseDuration,
    /// Power limit in whole watts; 0 means unlimited.
    PowerLimit,
}

/// Read access to the persisted user settings.
pub trait SettingsStore {
    fn get(&self, option: SettingsOption) -> i32;
}

impl<T: TipSensor + ?Sized> TipSensor for Box<T> {
    fn tip_temp_c(
        &mut self,
        filtered: bool,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).tip_temp_c(filtered)
    }

    fn max_tip_temp_c(&self) -> i32 {
        (**self).max_tip_temp_c()
    }

    fn raw_tip_signal(
        &mut self,
        channel: u8,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).raw_tip_signal(channel)
    }
}

impl<T: Heater + ?Sized> Heater for Box<T> {
    fn set_x10_watts(
        &mut self,
        x10_watts: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_x10_watts(x10_watts)
    }

    fn disable_output(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).disable_output()
    }
}

impl<T: Watchdog + ?Sized> Watchdog for Box<T> {
    fn feed(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).feed()
    }
}
