//! Host-side orchestration: drive a `ControlLoop` from a tick generator
//! thread until a deadline, an external stop, or a terminal condition.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tipctl_traits::clock::Clock;

use crate::builder::ControlLoop;
use crate::error::AbortReason;
use crate::sampler::Sampler;
use crate::status::{CycleOutcome, CycleReport, LoopStats};
use crate::tick::TickNotifier;

/// What to run and when to give up.
#[derive(Debug, Clone, Copy)]
pub struct RunPlan {
    pub target_c: u32,
    /// Stop after this long; `None` runs until stopped.
    pub duration_ms: Option<u64>,
    /// Suspend the tick generator after this long to reproduce a stall.
    pub stall_after_ms: Option<u64>,
    /// End the run after this many consecutive tick timeouts (0 never ends).
    pub max_consecutive_timeouts: u32,
}

impl Default for RunPlan {
    fn default() -> Self {
        Self {
            target_c: 0,
            duration_ms: None,
            stall_after_ms: None,
            max_consecutive_timeouts: 2,
        }
    }
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Elapsed,
    Stopped,
    ThermalRunaway,
    SamplingStalled,
}

impl RunEnd {
    /// The abort reason for runs that ended on a fault.
    pub fn abort_reason(self) -> Option<AbortReason> {
        match self {
            RunEnd::ThermalRunaway => Some(AbortReason::ThermalRunaway),
            RunEnd::SamplingStalled => Some(AbortReason::SamplingStalled),
            RunEnd::Elapsed | RunEnd::Stopped => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub end: RunEnd,
    pub elapsed_ms: u64,
    pub stats: LoopStats,
    pub last_report: Option<CycleReport>,
    pub ticks_posted: u64,
}

/// Run `ctl` with a tick generator at `loop_hz`.
///
/// The loop is started (warm-up) before the set point is applied, so the
/// target written here is the one the first processed tick sees.
pub fn run(
    ctl: &mut ControlLoop,
    notifier: TickNotifier,
    loop_hz: u32,
    clock: Arc<dyn Clock + Send + Sync>,
    plan: RunPlan,
    stop: &AtomicBool,
) -> RunSummary {
    ctl.start();
    ctl.handle().set_target_c(plan.target_c);

    let sampler = Sampler::spawn(notifier, loop_hz, clock.clone());
    let epoch = clock.now();
    tracing::info!(target_c = plan.target_c, loop_hz, "run start");

    let mut consecutive_timeouts = 0u32;
    let end = loop {
        let elapsed = clock.ms_since(epoch);
        if stop.load(Ordering::Relaxed) {
            break RunEnd::Stopped;
        }
        if plan.duration_ms.is_some_and(|d| elapsed >= d) {
            break RunEnd::Elapsed;
        }
        if let Some(at) = plan.stall_after_ms
            && elapsed >= at
            && !sampler.is_stalled()
        {
            tracing::info!(elapsed_ms = elapsed, "suspending tick generator");
            sampler.stall();
        }

        match ctl.run_cycle() {
            CycleOutcome::TickTimeout => {
                consecutive_timeouts = consecutive_timeouts.saturating_add(1);
                if plan.max_consecutive_timeouts > 0
                    && consecutive_timeouts >= plan.max_consecutive_timeouts
                {
                    tracing::error!(
                        consecutive_timeouts,
                        stalled_for_ms = sampler.stalled_for_ms(),
                        "sampling stalled"
                    );
                    break RunEnd::SamplingStalled;
                }
            }
            CycleOutcome::Issued(_) | CycleOutcome::SensorFault(_) => consecutive_timeouts = 0,
        }
        if ctl.thermal_runaway() {
            break RunEnd::ThermalRunaway;
        }
    };

    if let Err(e) = ctl.disable_output() {
        tracing::warn!(error = %e, "disable_output failed at end of run");
    }
    let ticks_posted = sampler.ticks();
    drop(sampler);

    let summary = RunSummary {
        end,
        elapsed_ms: clock.ms_since(epoch),
        stats: ctl.stats(),
        last_report: ctl.last_report().copied(),
        ticks_posted,
    };
    tracing::info!(end = ?summary.end, cycles = summary.stats.cycles, "run end");
    summary
}
