//! Coalescing tick notification between the sampling side and the loop.
//!
//! Behaves like a task notification: at most one tick is pending, and extra
//! notifications while one is pending are dropped.
use crossbeam_channel as xch;
use std::time::Duration;

/// Outcome of one bounded tick wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickWait {
    Tick,
    TimedOut,
    /// Every notifier is gone; no tick can arrive any more.
    Disconnected,
}

/// Create a connected notifier/waiter pair.
pub fn tick_channel() -> (TickNotifier, TickWaiter) {
    let (tx, rx) = xch::bounded(1);
    (TickNotifier { tx }, TickWaiter { rx })
}

#[derive(Debug, Clone)]
pub struct TickNotifier {
    tx: xch::Sender<()>,
}

impl TickNotifier {
    /// Post a tick. Returns `false` once the waiter has been dropped.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(xch::TrySendError::Full(())) => true,
            Err(xch::TrySendError::Disconnected(())) => false,
        }
    }
}

#[derive(Debug)]
pub struct TickWaiter {
    rx: xch::Receiver<()>,
}

impl TickWaiter {
    /// Block until a tick arrives or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> TickWait {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => TickWait::Tick,
            Err(xch::RecvTimeoutError::Timeout) => TickWait::TimedOut,
            Err(xch::RecvTimeoutError::Disconnected) => TickWait::Disconnected,
        }
    }
}
