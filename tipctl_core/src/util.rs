//! Common time/period helpers for tipctl_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Period in microseconds for a loop rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}
