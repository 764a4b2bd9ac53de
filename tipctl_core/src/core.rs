//! The tip temperature control loop (`ControlLoopCore`).
//!
//! Each cycle waits for a tick, reads the tip, runs the power controller and
//! the runaway detector, shapes the request through the safety chain, issues
//! it, and feeds the watchdog. A missing tick turns the heater off instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use tipctl_traits::clock::Clock;
use tipctl_traits::{Heater, SettingsStore, TipSensor, Watchdog};

use crate::config::Timeouts;
use crate::controller::PowerController;
use crate::error::Result;
use crate::history::ErrorHistory;
use crate::hw_error::map_hw_error;
use crate::runaway::ThermalRunawayDetector;
use crate::safety::{ChainInputs, OutputSafetyChain, SafetyLimits};
use crate::shared::ControlHandle;
use crate::status::{CycleOutcome, CycleReport, LoopStats};
use crate::tick::{TickWait, TickWaiter};

/// Control loop over concrete sensor, heater and watchdog types.
pub struct ControlLoopCore<S: TipSensor, H: Heater, W: Watchdog> {
    pub(crate) sensor: S,
    pub(crate) heater: H,
    pub(crate) watchdog: W,
    pub(crate) ticks: TickWaiter,
    pub(crate) settings: Arc<dyn SettingsStore + Send + Sync>,
    pub(crate) handle: ControlHandle,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,

    pub(crate) controller: PowerController,
    pub(crate) history: ErrorHistory,
    pub(crate) runaway: ThermalRunawayDetector,
    pub(crate) chain: OutputSafetyChain,
    pub(crate) timeouts: Timeouts,
    pub(crate) diagnostics: bool,

    pub(crate) started: bool,
    pub(crate) last_report: Option<CycleReport>,
    pub(crate) stats: LoopStats,
}

impl<S: TipSensor, H: Heater, W: Watchdog> core::fmt::Debug for ControlLoopCore<S, H, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoopCore")
            .field("target_c", &self.handle.target_c())
            .field("started", &self.started)
            .field("thermal_runaway", &self.runaway.is_faulted())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<S: TipSensor, H: Heater, W: Watchdog> ControlLoopCore<S, H, W> {
    /// Shared handle for the set point, supply limit and runaway flag.
    pub fn handle(&self) -> &ControlHandle {
        &self.handle
    }

    /// State of the last processed cycle, if any.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn history(&self) -> &ErrorHistory {
        &self.history
    }

    /// Zero the output, reset the set point, and discard the first filtered
    /// readings. `run_cycle` calls this on first use.
    pub fn start(&mut self) {
        if let Err(e) = self.heater.set_x10_watts(0) {
            tracing::warn!(error = %e, "zeroing heater at start failed");
        }
        self.handle.set_target_c(0);

        let delay = Duration::from_millis(self.timeouts.warmup_delay_ms);
        for _ in 0..self.timeouts.warmup_reads {
            self.clock.sleep(delay);
            if let Err(e) = self.sensor.tip_temp_c(true) {
                tracing::trace!(error = %e, "warm-up read failed");
            }
        }
        self.started = true;
        tracing::info!(
            warmup_reads = self.timeouts.warmup_reads,
            tick_ms = self.timeouts.tick_ms,
            "control loop started"
        );
    }

    /// Wait for one tick (bounded) and act on it.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if !self.started {
            self.start();
        }
        self.stats.cycles = self.stats.cycles.saturating_add(1);

        let timeout = Duration::from_millis(self.timeouts.tick_ms);
        match self.ticks.wait(timeout) {
            TickWait::Tick => self.process_tick(),
            TickWait::TimedOut => self.on_tick_timeout(),
            TickWait::Disconnected => {
                // keep the timeout cadence even with no tick source left
                self.clock.sleep(timeout);
                self.on_tick_timeout()
            }
        }
    }

    /// Cycle until `stop` is set. Checked between cycles only.
    pub fn run_until(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            let _ = self.run_cycle();
        }
    }

    /// Cycle forever.
    pub fn run_forever(&mut self) -> ! {
        loop {
            let _ = self.run_cycle();
        }
    }

    /// Cut the heater directly (best-effort callers log the error).
    pub fn disable_output(&mut self) -> Result<()> {
        self.heater
            .disable_output()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("disable_output")
    }

    // ── Private: cycle branches ──────────────────────────────────────────────

    fn on_tick_timeout(&mut self) -> CycleOutcome {
        self.stats.tick_timeouts = self.stats.tick_timeouts.saturating_add(1);
        tracing::warn!(
            timeout_ms = self.timeouts.tick_ms,
            "no sampling tick; heater output disabled"
        );
        if let Err(e) = self.disable_output() {
            tracing::warn!(error = %e, "disable_output failed on tick timeout");
        }
        CycleOutcome::TickTimeout
    }

    fn process_tick(&mut self) -> CycleOutcome {
        let measured_c = match self.sensor.tip_temp_c(true) {
            Ok(t) => t,
            Err(e) => {
                let err = map_hw_error(&*e);
                self.stats.sensor_faults = self.stats.sensor_faults.saturating_add(1);
                tracing::warn!(error = %err, "tip temperature read failed; heater output disabled");
                if let Err(e) = self.disable_output() {
                    tracing::warn!(error = %e, "disable_output failed on sensor fault");
                }
                return CycleOutcome::SensorFault(err);
            }
        };

        let target_c = self.handle.target_c();
        let max_rated_c = self.sensor.max_tip_temp_c();
        let now_ms = self.clock.ms_since(self.epoch);

        let computation =
            self.controller
                .compute(target_c, measured_c, max_rated_c, &mut self.history);

        if self
            .runaway
            .observe(measured_c, computation.error_c, now_ms)
        {
            self.handle.latch_thermal_runaway();
            tracing::error!(
                measured_c,
                error_c = computation.error_c,
                reference_c = self.runaway.state().reference_c,
                "thermal runaway: tip not heating; output locked off"
            );
        }

        let raw_signal = match self.sensor.raw_tip_signal(0) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(error = %e, "raw tip signal read failed; treating as saturated");
                None
            }
        };

        let limits = SafetyLimits::snapshot(self.settings.as_ref(), self.handle.supply_limit_w());
        let issued_x10w = self.chain.apply(
            computation.request_x10w,
            &ChainInputs {
                now_ms,
                raw_signal,
                runaway_faulted: self.runaway.is_faulted(),
                limits,
            },
        );

        if let Err(e) = self.heater.set_x10_watts(issued_x10w) {
            tracing::warn!(error = %e, x10w = issued_x10w, "heater command failed");
        }

        let report = CycleReport {
            target_c: computation.target_c,
            measured_c,
            error_c: computation.error_c,
            proportional_x10w: computation.proportional_x10w,
            integral_x10w: computation.integral_x10w,
            requested_x10w: computation.request_x10w,
            issued_x10w,
            thermal_runaway: self.runaway.is_faulted(),
        };
        if self.diagnostics {
            tracing::debug!(
                target_c = report.target_c,
                measured_c = report.measured_c,
                error_c = report.error_c,
                p_x10w = report.proportional_x10w,
                i_x10w = report.integral_x10w,
                requested_x10w = report.requested_x10w,
                issued_x10w = report.issued_x10w,
                "tip control state"
            );
        }

        match self.watchdog.feed() {
            Ok(()) => self.stats.watchdog_feeds = self.stats.watchdog_feeds.saturating_add(1),
            Err(e) => tracing::warn!(error = %e, "watchdog feed failed"),
        }

        tracing::trace!(now_ms, issued_x10w, "cycle done");
        self.stats.issued = self.stats.issued.saturating_add(1);
        self.last_report = Some(report);
        CycleOutcome::Issued(report)
    }
}
