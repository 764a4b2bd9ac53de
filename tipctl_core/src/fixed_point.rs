//! Integer helpers for temperatures (°C) and powers (x10W).
//!
//! The control path stays in integers; every helper here saturates instead of
//! wrapping so extreme sensor values cannot flip the sign of a command.

/// Saturate an `i64` into the `i16` range, returned widened to `i32`.
#[inline]
pub fn clamp_to_i16(v: i64) -> i32 {
    v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i32
}

/// Saturate an `i32` temperature into an `i16`.
#[inline]
pub fn temp_to_i16(c: i32) -> i16 {
    c.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// Whole watts to tenths of a watt, saturating.
#[inline]
pub fn watts_to_x10(w: i32) -> i32 {
    w.saturating_mul(10)
}

/// Absolute difference of two `i16` temperatures, without overflow.
#[inline]
pub fn abs_diff_i16(a: i16, b: i16) -> i32 {
    (i32::from(a) - i32::from(b)).abs()
}
