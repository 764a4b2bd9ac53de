//! Configuration types for the control loop.
//!
//! These are the runtime configuration structs used by `ControlLoopCore`.
//! They are separate from the TOML-deserialized config in `tipctl_config`.

/// Controller configuration (set point handling and gains).
#[derive(Debug, Clone, Copy)]
pub struct ControlCfg {
    /// Loop rate in Hz. Also the error history length, so the integral
    /// window is one second.
    pub loop_hz: u32,
    /// Absolute set point ceiling in °C, applied before the tip rating.
    pub max_target_c: i32,
    /// Added to `target - measured` for every error sample.
    pub bias_c: i32,
    /// x10W needed to move the tip by 1 °C in one second.
    pub thermal_mass_x10j_per_c: i32,
    /// Multiplier on the averaged error.
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

/// Timeouts and start-up timing.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Longest wait for a tick before the output is forced off.
    pub tick_ms: u64,
    /// Filtered reads discarded at start.
    pub warmup_reads: u32,
    /// Delay before each warm-up read.
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

/// Thermal runaway detection.
#[derive(Debug, Clone, Copy)]
pub struct RunawayCfg {
    /// Error (°C) above which the loop is heating hard; also the minimum
    /// temperature movement that counts as progress.
    pub threshold_c: i32,
    /// Heating hard without progress for longer than this trips the fault.
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

/// Output shaping options fixed at build time.
#[derive(Debug, Clone, Copy)]
pub struct OutputCfg {
    /// Raw tip signal strictly above this forces the output to zero.
    pub saturation_threshold: i32,
    /// Max per-cycle increase of the issued power (x10W). `None` disables.
    pub slew_limit_x10w: Option<i32>,
    /// Emit a `debug` event with controller state for each issued command.
    pub diagnostics: bool,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            saturation_threshold: 0x7FFF - 32,
            slew_limit_x10w: None,
            diagnostics: false,
        }
    }
}

/// Time units for the keep-awake settings.
#[derive(Debug, Clone, Copy)]
pub struct KeepAwakeCfg {
    pub wait_unit_ms: u64,
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
