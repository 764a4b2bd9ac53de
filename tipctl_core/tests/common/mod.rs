#![allow(dead_code)]
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tipctl_traits::{Heater, TipSensor, Watchdog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Set(i32),
    Disable,
    Feed,
}

/// Ordered record of heater and watchdog calls.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, e: Event) {
        self.0.lock().unwrap().push(e);
    }
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Sensor whose readings are set by the test.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    pub temp_c: Arc<AtomicI32>,
    pub raw: Arc<AtomicI32>,
    pub fail_temp: Arc<AtomicBool>,
    pub fail_raw: Arc<AtomicBool>,
    pub reads: Arc<AtomicU32>,
    pub max_c: i32,
}

impl ScriptedSensor {
    pub fn new(temp_c: i32) -> Self {
        Self {
            temp_c: Arc::new(AtomicI32::new(temp_c)),
            raw: Arc::new(AtomicI32::new(1000)),
            fail_temp: Arc::new(AtomicBool::new(false)),
            fail_raw: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicU32::new(0)),
            max_c: 450,
        }
    }
    pub fn set_temp(&self, c: i32) {
        self.temp_c.store(c, Ordering::Relaxed);
    }
    pub fn set_raw(&self, raw: i32) {
        self.raw.store(raw, Ordering::Relaxed);
    }
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl TipSensor for ScriptedSensor {
    fn tip_temp_c(&mut self, _filtered: bool) -> Result<i32, Box<dyn Error + Send + Sync>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_temp.load(Ordering::Relaxed) {
            return Err("adc timeout".into());
        }
        Ok(self.temp_c.load(Ordering::Relaxed))
    }
    fn max_tip_temp_c(&self) -> i32 {
        self.max_c
    }
    fn raw_tip_signal(&mut self, _channel: u8) -> Result<i32, Box<dyn Error + Send + Sync>> {
        if self.fail_raw.load(Ordering::Relaxed) {
            return Err("raw read failed".into());
        }
        Ok(self.raw.load(Ordering::Relaxed))
    }
}

pub struct LogHeater(pub EventLog);

impl Heater for LogHeater {
    fn set_x10_watts(&mut self, x10_watts: i32) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.0.push(Event::Set(x10_watts));
        Ok(())
    }
    fn disable_output(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.0.push(Event::Disable);
        Ok(())
    }
}

pub struct LogWatchdog(pub EventLog);

impl Watchdog for LogWatchdog {
    fn feed(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.0.push(Event::Feed);
        Ok(())
    }
}
