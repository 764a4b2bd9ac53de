//! Proportional + averaged-error power controller.
//!
//! There is no derivative term: tip temperature readings are too noisy for a
//! useful one.

use crate::config::ControlCfg;
use crate::fixed_point::clamp_to_i16;
use crate::history::ErrorHistory;

/// Result of one controller evaluation. All powers are x10W.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerComputation {
    /// Effective set point after clamping, 0 when idle.
    pub target_c: i32,
    /// Biased error fed to the history; 0 when idle.
    pub error_c: i32,
    pub proportional_x10w: i32,
    pub integral_x10w: i32,
    /// Unshaped request: proportional + integral.
    pub request_x10w: i32,
}

impl PowerComputation {
    pub fn is_idle(&self) -> bool {
        self.target_c == 0
    }
}

#[derive(Debug, Clone)]
pub struct PowerController {
    max_target_c: i32,
    bias_c: i32,
    thermal_mass_x10j_per_c: i32,
    integral_gain: i32,
}

impl PowerController {
    pub fn new(cfg: &ControlCfg) -> Self {
        Self {
            max_target_c: cfg.max_target_c,
            bias_c: cfg.bias_c,
            thermal_mass_x10j_per_c: cfg.thermal_mass_x10j_per_c,
            integral_gain: cfg.integral_gain,
        }
    }

    /// `min(target, max_target_c, max_rated_c)`.
    pub fn effective_target(&self, target_c: u32, max_rated_c: i32) -> i32 {
        let requested = i32::try_from(target_c).unwrap_or(i32::MAX);
        requested.min(self.max_target_c).min(max_rated_c)
    }

    /// Power needed to move the tip by `error_c` degrees in one second.
    pub fn proportional_x10w(&self, error_c: i32) -> i32 {
        error_c.saturating_mul(self.thermal_mass_x10j_per_c)
    }

    /// Evaluate one cycle. A zero target is idle: the history is left alone
    /// and the request is 0.
    pub fn compute(
        &self,
        target_c: u32,
        measured_c: i32,
        max_rated_c: i32,
        history: &mut ErrorHistory,
    ) -> PowerComputation {
        if target_c == 0 {
            return PowerComputation::default();
        }
        let target = self.effective_target(target_c, max_rated_c);
        let error = clamp_to_i16(
            i64::from(target) - i64::from(measured_c) + i64::from(self.bias_c),
        );
        history.update(error);

        let proportional = self.proportional_x10w(error);
        let integral = history.average().saturating_mul(self.integral_gain);
        PowerComputation {
            target_c: target,
            error_c: error,
            proportional_x10w: proportional,
            integral_x10w: integral,
            request_x10w: proportional.saturating_add(integral),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PowerController {
        PowerController::new(&ControlCfg::default())
    }

    #[test]
    fn idle_target_skips_computation() {
        let mut h = ErrorHistory::new(8);
        h.update(40);
        let out = controller().compute(0, 200, 450, &mut h);
        assert!(out.is_idle());
        assert_eq!(out.request_x10w, 0);
        assert_eq!(out.error_c, 0);
        assert_eq!(h.sum(), 40, "history must not change while idle");
    }

    #[test]
    fn error_includes_bias() {
        let mut h = ErrorHistory::new(8);
        let out = controller().compute(300, 250, 450, &mut h);
        assert_eq!(out.error_c, 51);
        assert_eq!(out.proportional_x10w, 51 * 65);
        assert_eq!(out.integral_x10w, 51 / 8);
        assert_eq!(out.request_x10w, 51 * 65 + 51 / 8);
    }

    #[test]
    fn target_is_clamped_to_ceiling_and_rating() {
        let c = controller();
        assert_eq!(c.effective_target(500, 480), 450);
        assert_eq!(c.effective_target(500, 400), 400);
        assert_eq!(c.effective_target(u32::MAX, 1000), 450);
        assert_eq!(c.effective_target(320, 400), 320);
    }

    #[test]
    fn error_saturates_to_i16() {
        let mut h = ErrorHistory::new(8);
        let hot = controller().compute(100, 100_000, 450, &mut h);
        assert_eq!(hot.error_c, i32::from(i16::MIN));
        let cold = controller().compute(450, -100_000, 450, &mut h);
        assert_eq!(cold.error_c, i32::from(i16::MAX));
    }

    #[test]
    fn negative_error_gives_negative_request() {
        let mut h = ErrorHistory::new(8);
        let out = controller().compute(200, 260, 450, &mut h);
        assert!(out.request_x10w < 0);
    }
}
