#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the tip controller.
//!
//! `Config` and its sections are deserialized from TOML and validated with
//! [`Config::validate`]. Every section has defaults, so an empty file is a
//! valid configuration for the simulator.
use serde::Deserialize;

/// Full-scale of the tip ADC channel after oversampling.
pub const ADC_FULL_SCALE: i32 = 0x7FFF;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Control loop rate; also the length of the error history window.
    pub loop_hz: u32,
    /// Hard ceiling for any set point, in °C.
    pub max_target_c: i32,
    /// Added to every error sample so the tip settles slightly above target.
    pub bias_c: i32,
    /// Tip thermal mass in tenths of a joule per °C (drives the P term).
    pub thermal_mass_x10j_per_c: i32,
    /// Multiplier applied to the averaged error (the I term).
    pub integral_gain: i32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            loop_hz: 8,
            max_target_c: 450,
            bias_c: 1,
            thermal_mass_x10j_per_c: 65,
            integral_gain: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Longest wait for a sampling tick before the output is forced off.
    pub tick_ms: u64,
    /// Discarded sensor reads at start-up to settle the sensor filters.
    pub warmup_reads: u32,
    /// Pause between warm-up reads.
    pub warmup_delay_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            tick_ms: 2000,
            warmup_reads: 64,
            warmup_delay_ms: 2,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunawayCfg {
    /// Error above which the tip counts as "heating hard", and the temperature
    /// movement that counts as progress.
    pub threshold_c: i32,
    /// How long heating hard may go without progress before tripping.
    pub timeout_ms: u64,
}

impl Default for RunawayCfg {
    fn default() -> Self {
        Self {
            threshold_c: 10,
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputCfg {
    /// Raw tip signal above this is treated as a pinned ADC input.
    pub saturation_threshold: i32,
    /// Optional per-cycle increase limit on the issued power (x10W).
    pub slew_limit_x10w: Option<i32>,
    /// Emit a debug event with the controller state for every issued command.
    pub diagnostics: bool,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            saturation_threshold: ADC_FULL_SCALE - 32,
            slew_limit_x10w: None,
            diagnostics: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeepAwakeCfg {
    /// Length of one "wait" settings unit.
    pub wait_unit_ms: u64,
    /// Length of one "duration" settings unit.
    pub duration_unit_ms: u64,
}

impl Default for KeepAwakeCfg {
    fn default() -> Self {
        Self {
            wait_unit_ms: 2500,
            duration_unit_ms: 250,
        }
    }
}

/// Initial values for the user settings store and the supply limit.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SettingsCfg {
    pub power_limit_w: i32,
    pub keep_awake_pulse_x10w: i32,
    pub keep_awake_wait: i32,
    pub keep_awake_duration: i32,
    pub supply_limit_w: i32,
}

/// Parameters of the simulated tip used by the host runner.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub ambient_c: f32,
    /// Joules needed to raise the simulated tip by 1 °C.
    pub thermal_mass_j_per_c: f32,
    /// Heat loss in watts per °C above ambient.
    pub loss_w_per_c: f32,
    /// Rated maximum the simulated sensor reports.
    pub max_tip_c: i32,
    /// Raw ADC counts per °C above ambient.
    pub counts_per_c: f32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            thermal_mass_j_per_c: 6.5,
            loss_w_per_c: 0.05,
            max_tip_c: 450,
            counts_per_c: 40.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub control: ControlCfg,
    pub timeouts: Timeouts,
    pub runaway: RunawayCfg,
    pub output: OutputCfg,
    pub keep_awake: KeepAwakeCfg,
    pub settings: SettingsCfg,
    pub sim: SimCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        if self.control.loop_hz == 0 {
            eyre::bail!("control.loop_hz must be > 0");
        }
        if self.control.loop_hz > 1000 {
            eyre::bail!("control.loop_hz is unreasonably large (>1000)");
        }
        if !(1..=i32::from(i16::MAX)).contains(&self.control.max_target_c) {
            eyre::bail!("control.max_target_c must be in [1, 32767]");
        }
        if self.control.bias_c.abs() > 10 {
            eyre::bail!("control.bias_c must be in [-10, 10]");
        }
        if self.control.thermal_mass_x10j_per_c <= 0 {
            eyre::bail!("control.thermal_mass_x10j_per_c must be > 0");
        }
        if self.control.integral_gain < 0 {
            eyre::bail!("control.integral_gain must be >= 0");
        }

        // Timeouts
        if self.timeouts.tick_ms == 0 {
            eyre::bail!("timeouts.tick_ms must be >= 1");
        }
        if self.timeouts.warmup_delay_ms > 1000 {
            eyre::bail!("timeouts.warmup_delay_ms is unreasonably large (>1s)");
        }

        // Runaway
        if self.runaway.threshold_c <= 0 {
            eyre::bail!("runaway.threshold_c must be > 0");
        }
        if self.runaway.timeout_ms == 0 {
            eyre::bail!("runaway.timeout_ms must be >= 1");
        }

        // Output
        if !(0..=ADC_FULL_SCALE).contains(&self.output.saturation_threshold) {
            eyre::bail!("output.saturation_threshold must be in [0, 32767]");
        }
        if let Some(step) = self.output.slew_limit_x10w
            && step <= 0
        {
            eyre::bail!("output.slew_limit_x10w must be > 0 when set");
        }

        // Keep-awake
        if self.keep_awake.wait_unit_ms == 0 || self.keep_awake.duration_unit_ms == 0 {
            eyre::bail!("keep_awake units must be >= 1 ms");
        }

        // Settings
        let s = &self.settings;
        if s.power_limit_w < 0 || s.supply_limit_w < 0 {
            eyre::bail!("settings power limits must be >= 0");
        }
        if s.keep_awake_pulse_x10w < 0 || s.keep_awake_wait < 0 || s.keep_awake_duration < 0 {
            eyre::bail!("settings keep-awake values must be >= 0");
        }

        // Simulator
        if !(self.sim.thermal_mass_j_per_c.is_finite() && self.sim.thermal_mass_j_per_c > 0.0) {
            eyre::bail!("sim.thermal_mass_j_per_c must be > 0");
        }
        if !(self.sim.loss_w_per_c.is_finite() && self.sim.loss_w_per_c >= 0.0) {
            eyre::bail!("sim.loss_w_per_c must be >= 0");
        }
        if !(self.sim.counts_per_c.is_finite() && self.sim.counts_per_c > 0.0) {
            eyre::bail!("sim.counts_per_c must be > 0");
        }
        if self.sim.max_tip_c <= 0 {
            eyre::bail!("sim.max_tip_c must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
