//! Type-state builder for `ControlLoop` and generic `build_control_loop`.
//!
//! The builder enforces at compile time that the sensor, heater and watchdog
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use tipctl_traits::clock::{Clock, MonotonicClock};
use tipctl_traits::{Heater, SettingsStore, TipSensor, Watchdog};

use crate::config::*;
use crate::controller::PowerController;
use crate::core::ControlLoopCore;
use crate::error::{BuildError, Result};
use crate::history::ErrorHistory;
use crate::runaway::ThermalRunawayDetector;
use crate::safety::OutputSafetyChain;
use crate::shared::{ControlHandle, LiveSettings};
use crate::status::{CycleOutcome, CycleReport, LoopStats};
use crate::tick::TickWaiter;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

type BoxedCore = ControlLoopCore<Box<dyn TipSensor>, Box<dyn Heater>, Box<dyn Watchdog>>;

/// Boxed control loop.
pub struct ControlLoop {
    pub(crate) inner: BoxedCore,
}

impl core::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("inner", &self.inner)
            .finish()
    }
}

impl ControlLoop {
    /// Start building a ControlLoop.
    pub fn builder() -> ControlLoopBuilder<Missing, Missing, Missing> {
        ControlLoopBuilder::default()
    }

    pub fn handle(&self) -> &ControlHandle {
        self.inner.handle()
    }

    /// Zero the output and run the warm-up reads.
    pub fn start(&mut self) {
        self.inner.start();
    }

    /// One bounded tick wait and its action.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.inner.run_cycle()
    }

    /// Cycle until `stop` is set.
    pub fn run_until(&mut self, stop: &std::sync::atomic::AtomicBool) {
        self.inner.run_until(stop);
    }

    pub fn run_forever(&mut self) -> ! {
        self.inner.run_forever()
    }

    /// Cut the heater output.
    pub fn disable_output(&mut self) -> Result<()> {
        self.inner.disable_output()
    }

    /// Telemetry: controller and output state of the last processed cycle.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.inner.last_report()
    }

    /// Telemetry: counters since build.
    pub fn stats(&self) -> LoopStats {
        self.inner.stats()
    }

    /// Error window feeding the integral term.
    pub fn history(&self) -> &ErrorHistory {
        self.inner.history()
    }

    pub fn thermal_runaway(&self) -> bool {
        self.inner.handle().thermal_runaway()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `ControlLoop`. Configs default when not provided.
pub struct ControlLoopBuilder<S, H, W> {
    sensor: Option<Box<dyn TipSensor>>,
    heater: Option<Box<dyn Heater>>,
    watchdog: Option<Box<dyn Watchdog>>,
    ticks: Option<TickWaiter>,
    parts: LoopParts,
    _s: PhantomData<S>,
    _h: PhantomData<H>,
    _w: PhantomData<W>,
}

impl Default for ControlLoopBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            heater: None,
            watchdog: None,
            ticks: None,
            parts: LoopParts::default(),
            _s: PhantomData,
            _h: PhantomData,
            _w: PhantomData,
        }
    }
}

/// Everything besides the hardware and the tick source.
#[derive(Default)]
pub struct LoopParts {
    pub control: ControlCfg,
    pub timeouts: Timeouts,
    pub runaway: RunawayCfg,
    pub output: OutputCfg,
    pub keep_awake: KeepAwakeCfg,
    /// Defaults to an empty `LiveSettings` (all limits off).
    pub settings: Option<Arc<dyn SettingsStore + Send + Sync>>,
    /// Defaults to a fresh handle.
    pub handle: Option<ControlHandle>,
    /// Defaults to `MonotonicClock`.
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
}

/// Validate configuration and construct a `ControlLoopCore`.
///
/// Shared by `ControlLoopBuilder::try_build()` and `build_control_loop()`.
fn validate_and_build<S: TipSensor, H: Heater, W: Watchdog>(
    sensor: S,
    heater: H,
    watchdog: W,
    ticks: TickWaiter,
    parts: LoopParts,
) -> Result<ControlLoopCore<S, H, W>> {
    // ── Validation ───────────────────────────────────────────────────────────
    let LoopParts {
        control,
        timeouts,
        runaway,
        output,
        keep_awake,
        settings,
        handle,
        clock,
    } = parts;

    if control.loop_hz == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "loop_hz must be > 0",
        )));
    }
    if control.max_target_c <= 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "max_target_c must be > 0",
        )));
    }
    if control.thermal_mass_x10j_per_c <= 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "thermal_mass_x10j_per_c must be > 0",
        )));
    }
    if control.integral_gain < 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "integral_gain must be >= 0",
        )));
    }
    if timeouts.tick_ms == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick_ms must be >= 1",
        )));
    }
    if runaway.threshold_c <= 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "runaway threshold_c must be > 0",
        )));
    }
    if let Some(step) = output.slew_limit_x10w
        && step <= 0
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "slew_limit_x10w must be > 0 when set",
        )));
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(c) => c,
        None => Arc::new(MonotonicClock::new()),
    };
    let settings: Arc<dyn SettingsStore + Send + Sync> = match settings {
        Some(s) => s,
        None => Arc::new(LiveSettings::new()),
    };
    let epoch = clock.now();
    let history_len = usize::try_from(control.loop_hz).unwrap_or(usize::MAX);

    Ok(ControlLoopCore {
        sensor,
        heater,
        watchdog,
        ticks,
        settings,
        handle: handle.unwrap_or_default(),
        clock,
        epoch,
        controller: PowerController::new(&control),
        history: ErrorHistory::new(history_len),
        runaway: ThermalRunawayDetector::new(&runaway),
        chain: OutputSafetyChain::new(&output, &keep_awake),
        timeouts,
        diagnostics: output.diagnostics,
        started: false,
        last_report: None,
        stats: LoopStats::default(),
    })
}

impl<S, H, W> ControlLoopBuilder<S, H, W> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<ControlLoop> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let heater = self
            .heater
            .ok_or_else(|| eyre::Report::new(BuildError::MissingHeater))?;
        let watchdog = self
            .watchdog
            .ok_or_else(|| eyre::Report::new(BuildError::MissingWatchdog))?;
        let ticks = self
            .ticks
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTicks))?;

        let inner = validate_and_build(sensor, heater, watchdog, ticks, self.parts)?;
        Ok(ControlLoop { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<S, H, W> ControlLoopBuilder<S, H, W> {
    pub fn with_ticks(mut self, ticks: TickWaiter) -> Self {
        self.ticks = Some(ticks);
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.parts.control = control;
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.parts.timeouts = timeouts;
        self
    }
    pub fn with_runaway(mut self, runaway: RunawayCfg) -> Self {
        self.parts.runaway = runaway;
        self
    }
    pub fn with_output(mut self, output: OutputCfg) -> Self {
        self.parts.output = output;
        self
    }
    pub fn with_keep_awake(mut self, keep_awake: KeepAwakeCfg) -> Self {
        self.parts.keep_awake = keep_awake;
        self
    }
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore + Send + Sync>) -> Self {
        self.parts.settings = Some(settings);
        self
    }
    /// Share an existing handle (set point, supply limit, runaway flag).
    pub fn with_handle(mut self, handle: ControlHandle) -> Self {
        self.parts.handle = Some(handle);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.parts.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<H, W> ControlLoopBuilder<Missing, H, W> {
    pub fn with_sensor(self, sensor: impl TipSensor + 'static) -> ControlLoopBuilder<Set, H, W> {
        ControlLoopBuilder {
            sensor: Some(Box::new(sensor)),
            heater: self.heater,
            watchdog: self.watchdog,
            ticks: self.ticks,
            parts: self.parts,
            _s: PhantomData,
            _h: PhantomData,
            _w: PhantomData,
        }
    }
}

impl<S, W> ControlLoopBuilder<S, Missing, W> {
    pub fn with_heater(self, heater: impl Heater + 'static) -> ControlLoopBuilder<S, Set, W> {
        ControlLoopBuilder {
            sensor: self.sensor,
            heater: Some(Box::new(heater)),
            watchdog: self.watchdog,
            ticks: self.ticks,
            parts: self.parts,
            _s: PhantomData,
            _h: PhantomData,
            _w: PhantomData,
        }
    }
}

impl<S, H> ControlLoopBuilder<S, H, Missing> {
    pub fn with_watchdog(
        self,
        watchdog: impl Watchdog + 'static,
    ) -> ControlLoopBuilder<S, H, Set> {
        ControlLoopBuilder {
            sensor: self.sensor,
            heater: self.heater,
            watchdog: Some(Box::new(watchdog)),
            ticks: self.ticks,
            parts: self.parts,
            _s: PhantomData,
            _h: PhantomData,
            _w: PhantomData,
        }
    }
}

impl ControlLoopBuilder<Set, Set, Set> {
    /// Validate and build. Only available when sensor, heater and watchdog are set.
    pub fn build(self) -> Result<ControlLoop> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the same core.
pub type ControlLoopG<S, H, W> = ControlLoopCore<S, H, W>;

/// Build a statically-dispatched loop from concrete parts.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_control_loop<S, H, W>(
    sensor: S,
    heater: H,
    watchdog: W,
    ticks: TickWaiter,
    parts: LoopParts,
) -> Result<ControlLoopG<S, H, W>>
where
    S: TipSensor + 'static,
    H: Heater + 'static,
    W: Watchdog + 'static,
{
    validate_and_build(sensor, heater, watchdog, ticks, parts)
}
