//! Simulator wiring and run/self-check execution.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use tipctl_config::{Config, SimCfg};
use tipctl_core::error::{ControlError, Result as CoreResult};
use tipctl_core::runner::{RunEnd, RunPlan, RunSummary};
use tipctl_core::{ControlHandle, ControlLoop, CycleOutcome, LiveSettings, TickNotifier};
use tipctl_hardware::{SimulatedTip, SimulatedWatchdog, TipParams};
use tipctl_traits::clock::{Clock, MonotonicClock};

use crate::cli::{JSON_MODE, LAST_RUN, RunContext};

#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub target_c: u32,
    pub duration_ms: Option<u64>,
    pub supply_limit_w: Option<i32>,
    pub stall_after_ms: Option<u64>,
    pub open_heater: bool,
    pub stats: bool,
}

/// Consecutive missed ticks that end a run as stalled.
const STALL_TIMEOUTS: u32 = 2;

pub fn tip_params(sim: &SimCfg) -> TipParams {
    TipParams {
        ambient_c: sim.ambient_c,
        thermal_mass_j_per_c: sim.thermal_mass_j_per_c,
        loss_w_per_c: sim.loss_w_per_c,
        max_tip_c: sim.max_tip_c,
        counts_per_c: sim.counts_per_c,
    }
}

/// Build a loop over the simulated tip with every config section applied.
fn build_sim_loop(
    cfg: &Config,
    tip: &SimulatedTip,
    watchdog: SimulatedWatchdog,
    handle: ControlHandle,
    clock: Arc<dyn Clock + Send + Sync>,
) -> CoreResult<(ControlLoop, TickNotifier)> {
    let (notifier, waiter) = tipctl_core::tick_channel();
    let ctl = ControlLoop::builder()
        .with_sensor(tip.sensor())
        .with_heater(tip.heater())
        .with_watchdog(watchdog)
        .with_ticks(waiter)
        .with_control((&cfg.control).into())
        .with_timeouts((&cfg.timeouts).into())
        .with_runaway((&cfg.runaway).into())
        .with_output((&cfg.output).into())
        .with_keep_awake((&cfg.keep_awake).into())
        .with_settings(Arc::new(LiveSettings::from(&cfg.settings)))
        .with_handle(handle)
        .with_clock(clock)
        .build()?;
    Ok((ctl, notifier))
}

pub fn run_sim(cfg: &Config, opts: RunOpts, shutdown: &AtomicBool) -> CoreResult<RunSummary> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let tip = SimulatedTip::new(tip_params(&cfg.sim), clock.clone());
    if opts.open_heater {
        tip.set_heater_open(true);
    }
    let watchdog = SimulatedWatchdog::new();
    let handle = ControlHandle::from(&cfg.settings);
    if let Some(w) = opts.supply_limit_w {
        handle.set_supply_limit_w(w);
    }
    let _ = LAST_RUN.set(RunContext {
        target_c: opts.target_c,
        tick_ms: cfg.timeouts.tick_ms,
        runaway_threshold_c: cfg.runaway.threshold_c,
        runaway_timeout_ms: cfg.runaway.timeout_ms,
    });

    let (mut ctl, notifier) =
        build_sim_loop(cfg, &tip, watchdog.clone(), handle, clock.clone())
            .wrap_err("building control loop")?;

    let plan = RunPlan {
        target_c: opts.target_c,
        duration_ms: opts.duration_ms,
        stall_after_ms: opts.stall_after_ms,
        max_consecutive_timeouts: STALL_TIMEOUTS,
    };
    tracing::info!(
        target_c = opts.target_c,
        duration_ms = ?opts.duration_ms,
        open_heater = opts.open_heater,
        "sim run start"
    );
    let summary = tipctl_core::runner::run(
        &mut ctl,
        notifier,
        cfg.control.loop_hz,
        clock,
        plan,
        shutdown,
    );

    print_summary(&summary, tip.temperature_c());
    if opts.stats {
        print_stats(&summary, watchdog.feeds());
    }

    if let Some(reason) = summary.end.abort_reason() {
        let err = ControlError::Abort(reason);
        tracing::error!(error = %err, elapsed_ms = summary.elapsed_ms, "sim run aborted");
        return Err(eyre::Report::new(err));
    }
    tracing::info!(
        end = end_name(summary.end),
        elapsed_ms = summary.elapsed_ms,
        cycles = summary.stats.cycles,
        "sim run complete"
    );
    Ok(summary)
}

pub fn self_check(cfg: &Config) -> CoreResult<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let tip = SimulatedTip::new(tip_params(&cfg.sim), clock.clone());
    let watchdog = SimulatedWatchdog::new();
    let (mut ctl, notifier) = build_sim_loop(
        cfg,
        &tip,
        watchdog.clone(),
        ControlHandle::from(&cfg.settings),
        clock,
    )?;
    ctl.start();
    notifier.notify();
    match ctl.run_cycle() {
        CycleOutcome::Issued(report) => {
            println!(
                "self-check ok: tip {} °C, issued {} x10W, watchdog feeds {}",
                report.measured_c,
                report.issued_x10w,
                watchdog.feeds()
            );
            Ok(())
        }
        CycleOutcome::TickTimeout => Err(eyre::Report::new(ControlError::State(
            "self-check cycle timed out waiting for a tick".into(),
        ))),
        CycleOutcome::SensorFault(e) => {
            Err(eyre::Report::new(e)).wrap_err("self-check temperature read")
        }
    }
}

fn end_name(end: RunEnd) -> &'static str {
    match end {
        RunEnd::Elapsed => "elapsed",
        RunEnd::Stopped => "stopped",
        RunEnd::ThermalRunaway => "thermal_runaway",
        RunEnd::SamplingStalled => "sampling_stalled",
    }
}

fn print_summary(summary: &RunSummary, final_temp_c: f32) {
    let last_issued = summary.last_report.map(|r| r.issued_x10w);
    let runaway = summary.last_report.is_some_and(|r| r.thermal_runaway);
    if JSON_MODE.get().copied().unwrap_or(false) {
        let obj = serde_json::json!({
            "end": end_name(summary.end),
            "elapsed_ms": summary.elapsed_ms,
            "final_temp_c": final_temp_c,
            "last_issued_x10w": last_issued,
            "cycles": summary.stats.cycles,
            "tick_timeouts": summary.stats.tick_timeouts,
            "thermal_runaway": runaway,
        });
        println!("{obj}");
    } else {
        println!(
            "run {}: {:.1} °C after {} ms, last command {} x10W, {} cycles, {} tick timeouts, thermal runaway: {}",
            end_name(summary.end),
            final_temp_c,
            summary.elapsed_ms,
            last_issued.map_or_else(|| "-".to_string(), |x| x.to_string()),
            summary.stats.cycles,
            summary.stats.tick_timeouts,
            if runaway { "yes" } else { "no" },
        );
    }
}

/// Print loop counters to stderr.
fn print_stats(summary: &RunSummary, feeds: u64) {
    let s = summary.stats;
    eprintln!("\n--- Loop Stats ---");
    eprintln!("Cycles: {} (issued {})", s.cycles, s.issued);
    eprintln!("Ticks posted: {}", summary.ticks_posted);
    eprintln!("Tick timeouts: {}", s.tick_timeouts);
    eprintln!("Sensor faults: {}", s.sensor_faults);
    eprintln!("Watchdog feeds: {} (sim saw {feeds})", s.watchdog_feeds);
    eprintln!("------------------\n");
}
