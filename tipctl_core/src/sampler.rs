//! Background tick generator.
//!
//! Stands in for the ADC-complete interrupt on a host: a thread posts a tick
//! at the loop rate. Ticks can be suspended to reproduce a stalled sampler.
//!
//! Each `Sampler` spawns exactly one thread that is shut down and joined when
//! the `Sampler` is dropped.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tipctl_traits::clock::Clock;

use crate::tick::TickNotifier;

pub struct Sampler {
    ticks: Arc<AtomicU64>,
    last_tick_ms: Arc<AtomicU64>,
    stalled: Arc<AtomicBool>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn(notifier: TickNotifier, hz: u32, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stalled = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));
        let last_tick_ms = Arc::new(AtomicU64::new(0));
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();

        let join_handle = {
            let shutdown = shutdown.clone();
            let stalled = stalled.clone();
            let ticks = ticks.clone();
            let last_tick_ms = last_tick_ms.clone();
            let clock = clock.clone();
            std::thread::spawn(move || {
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        tracing::debug!("sampler thread received shutdown signal");
                        break;
                    }
                    if !stalled.load(Ordering::Relaxed) {
                        if !notifier.notify() {
                            tracing::debug!("control loop gone, sampler exiting");
                            break;
                        }
                        ticks.fetch_add(1, Ordering::Relaxed);
                        last_tick_ms.store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    clock.sleep(period);
                }
                tracing::trace!("sampler thread exiting cleanly");
            })
        };

        Self {
            ticks,
            last_tick_ms,
            stalled,
            clock,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Stop posting ticks until [`Sampler::resume`].
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.stalled.store(false, Ordering::Relaxed);
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::Relaxed)
    }

    /// Ticks posted so far (including coalesced ones).
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Milliseconds since the last posted tick.
    pub fn stalled_for_ms(&self) -> u64 {
        self.clock
            .ms_since(self.epoch)
            .saturating_sub(self.last_tick_ms.load(Ordering::Relaxed))
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // the thread wakes at most one period later
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("sampler thread joined"),
                Err(e) => tracing::warn!(?e, "sampler thread panicked during shutdown"),
            }
        }
    }
}
