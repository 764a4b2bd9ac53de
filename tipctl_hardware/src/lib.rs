//! Simulated soldering tip for host runs and tests.
//!
//! `SimulatedTip` owns a lumped thermal model (one heat capacity, linear loss
//! to ambient). The sensor and heater handles share it, so power requested
//! through the heater shows up as temperature on the sensor.
pub mod error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tipctl_traits::{Clock, Heater, TipSensor, Watchdog};

use crate::error::HwError;

/// Full-scale raw reading of the simulated tip ADC.
pub const SIM_ADC_FULL_SCALE: i32 = 0x7FFF;

/// Physical parameters of the simulated tip.
#[derive(Debug, Clone, Copy)]
pub struct TipParams {
    pub ambient_c: f32,
    pub thermal_mass_j_per_c: f32,
    pub loss_w_per_c: f32,
    pub max_tip_c: i32,
    pub counts_per_c: f32,
}

impl Default for TipParams {
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

#[derive(Debug)]
struct TipState {
    temp_c: f32,
    power_w: f32,
    last_update: Instant,
    heater_open: bool,
    adc_pinned: bool,
    sensor_timeout: bool,
    last_x10_watts: i32,
    disable_count: u64,
    command_count: u64,
}

/// Shared simulated tip. Clones refer to the same tip.
#[derive(Clone)]
pub struct SimulatedTip {
    params: TipParams,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Arc<Mutex<TipState>>,
}

impl core::fmt::Debug for SimulatedTip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.lock();
        f.debug_struct("SimulatedTip")
            .field("temp_c", &st.temp_c)
            .field("power_w", &st.power_w)
            .field("heater_open", &st.heater_open)
            .finish()
    }
}

impl SimulatedTip {
    pub fn new(params: TipParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let now = clock.now();
        Self {
            params,
            state: Arc::new(Mutex::new(TipState {
                temp_c: params.ambient_c,
                power_w: 0.0,
                last_update: now,
                heater_open: false,
                adc_pinned: false,
                sensor_timeout: false,
                last_x10_watts: 0,
                disable_count: 0,
                command_count: 0,
            })),
            clock,
        }
    }

    /// Sensor handle reading this tip.
    pub fn sensor(&self) -> SimulatedSensor {
        SimulatedSensor {
            tip: self.clone(),
            filtered_c: None,
        }
    }

    /// Heater handle driving this tip.
    pub fn heater(&self) -> SimulatedHeater {
        SimulatedHeater { tip: self.clone() }
    }

    pub fn params(&self) -> TipParams {
        self.params
    }

    /// Current model temperature (after integrating up to now).
    pub fn temperature_c(&self) -> f32 {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.temp_c
    }

    pub fn set_temperature_c(&self, temp_c: f32) {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.temp_c = temp_c;
    }

    /// Break the heater circuit: commands are accepted but produce no heat.
    pub fn set_heater_open(&self, open: bool) {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.heater_open = open;
    }

    /// Pin the raw ADC reading at full scale.
    pub fn set_adc_pinned(&self, pinned: bool) {
        self.lock().adc_pinned = pinned;
    }

    /// Make temperature reads fail with `HwError::Timeout`.
    pub fn set_sensor_timeout(&self, failing: bool) {
        self.lock().sensor_timeout = failing;
    }

    /// Last power command in x10W (0 after a disable).
    pub fn last_x10_watts(&self) -> i32 {
        self.lock().last_x10_watts
    }

    /// Number of raw output disables seen.
    pub fn disable_count(&self) -> u64 {
        self.lock().disable_count
    }

    /// Number of power commands seen.
    pub fn command_count(&self) -> u64 {
        self.lock().command_count
    }

    fn lock(&self) -> MutexGuard<'_, TipState> {
        // A poisoned lock only means another handle panicked mid-update; the
        // plain-data state is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn integrate(&self, st: &mut TipState) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(st.last_update).as_secs_f32();
        st.last_update = now;
        if dt <= 0.0 {
            return;
        }
        let heat_w = if st.heater_open { 0.0 } else { st.power_w };
        let loss_w = self.params.loss_w_per_c * (st.temp_c - self.params.ambient_c);
        st.temp_c += (heat_w - loss_w) * dt / self.params.thermal_mass_j_per_c;
    }
}

/// Temperature sensor view of a `SimulatedTip`.
///
/// The filtered reading is an exponential average, so a few warm-up reads are
/// needed before it tracks the tip.
#[derive(Debug)]
pub struct SimulatedSensor {
    tip: SimulatedTip,
    filtered_c: Option<f32>,
}

const FILTER_ALPHA: f32 = 0.25;

impl TipSensor for SimulatedSensor {
    fn tip_temp_c(
        &mut self,
        filtered: bool,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        let temp = {
            let mut st = self.tip.lock();
            if st.sensor_timeout {
                return Err(Box::new(HwError::Timeout));
            }
            self.tip.integrate(&mut st);
            st.temp_c
        };
        let y = match self.filtered_c {
            None => temp,
            Some(prev) => FILTER_ALPHA * temp + (1.0 - FILTER_ALPHA) * prev,
        };
        self.filtered_c = Some(y);
        let reading = if filtered { y } else { temp };
        Ok(reading.round() as i32)
    }

    fn max_tip_temp_c(&self) -> i32 {
        self.tip.params.max_tip_c
    }

    fn raw_tip_signal(
        &mut self,
        channel: u8,
    ) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        if channel != 0 {
            return Err(Box::new(HwError::InvalidChannel(channel)));
        }
        let mut st = self.tip.lock();
        if st.adc_pinned {
            return Ok(SIM_ADC_FULL_SCALE);
        }
        self.tip.integrate(&mut st);
        let counts = (st.temp_c - self.tip.params.ambient_c) * self.tip.params.counts_per_c;
        Ok((counts.round() as i32).clamp(0, SIM_ADC_FULL_SCALE))
    }
}

/// Heater view of a `SimulatedTip`.
#[derive(Debug)]
pub struct SimulatedHeater {
    tip: SimulatedTip,
}

impl Heater for SimulatedHeater {
    fn set_x10_watts(
        &mut self,
        x10_watts: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.tip.lock();
        self.tip.integrate(&mut st);
        st.power_w = (x10_watts.max(0) as f32) / 10.0;
        st.last_x10_watts = x10_watts;
        st.command_count = st.command_count.saturating_add(1);
        tracing::trace!(x10_watts, "sim heater command");
        Ok(())
    }

    fn disable_output(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.tip.lock();
        self.tip.integrate(&mut st);
        st.power_w = 0.0;
        st.last_x10_watts = 0;
        st.disable_count = st.disable_count.saturating_add(1);
        tracing::trace!("sim heater disabled");
        Ok(())
    }
}

/// Watchdog that counts feeds; clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWatchdog {
    feeds: Arc<AtomicU64>,
}

impl SimulatedWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeds(&self) -> u64 {
        self.feeds.load(Ordering::Relaxed)
    }
}

impl Watchdog for SimulatedWatchdog {
    fn feed(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.feeds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
