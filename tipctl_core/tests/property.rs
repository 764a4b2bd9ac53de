use proptest::prelude::*;
use tipctl_core::config::{ControlCfg, KeepAwakeCfg, OutputCfg, RunawayCfg};
use tipctl_core::{
    ChainInputs, ErrorHistory, OutputSafetyChain, PowerController, SafetyLimits,
    ThermalRunawayDetector,
};

proptest! {
    #[test]
    fn error_always_fits_i16(target in 1u32..u32::MAX, measured in any::<i32>(), max_rated in 1i32..2000) {
        let c = PowerController::new(&ControlCfg::default());
        let mut h = ErrorHistory::new(8);
        let out = c.compute(target, measured, max_rated, &mut h);
        prop_assert!(out.error_c >= i32::from(i16::MIN) && out.error_c <= i32::from(i16::MAX));
        prop_assert!(out.target_c <= 450 && out.target_c <= max_rated);
    }

    #[test]
    fn full_window_average_is_mean(samples in proptest::collection::vec(-5000i32..5000, 8)) {
        let mut h = ErrorHistory::new(8);
        for s in &samples {
            h.update(*s);
        }
        let sum: i64 = samples.iter().map(|&s| i64::from(s)).sum();
        prop_assert_eq!(i64::from(h.average()), sum / 8);
    }

    #[test]
    fn constant_error_is_steady_after_window(e in -32768i32..32767, extra in 0usize..20) {
        let mut h = ErrorHistory::new(8);
        for _ in 0..(8 + extra) {
            h.update(e);
        }
        prop_assert_eq!(h.average(), e);
    }

    #[test]
    fn issued_never_exceeds_ceilings(
        raw in any::<i32>(),
        power_w in 0i32..200,
        supply_w in 0i32..200,
        pulse in 0i32..100,
        now_ms in 0u64..100_000,
    ) {
        let mut chain = OutputSafetyChain::new(&OutputCfg::default(), &KeepAwakeCfg::default());
        let limits = SafetyLimits {
            keep_awake_pulse_x10w: pulse,
            keep_awake_wait: 1,
            keep_awake_duration: 1,
            power_limit_w: power_w,
            supply_limit_w: supply_w,
        };
        let out = chain.apply(raw, &ChainInputs { now_ms, raw_signal: Some(0), runaway_faulted: false, limits });
        if power_w > 0 {
            prop_assert!(out <= power_w * 10);
        }
        if supply_w > 0 {
            prop_assert!(out <= supply_w * 10);
        }
    }

    #[test]
    fn faulted_or_saturated_means_zero(raw in any::<i32>(), pulse in 0i32..100, signal in 0x7FE0i32..=0x7FFF) {
        let mut chain = OutputSafetyChain::new(&OutputCfg::default(), &KeepAwakeCfg::default());
        let limits = SafetyLimits { keep_awake_pulse_x10w: pulse, keep_awake_duration: 2, ..SafetyLimits::default() };
        let saturated = ChainInputs { now_ms: 1, raw_signal: Some(signal), runaway_faulted: false, limits };
        prop_assert_eq!(chain.apply(raw, &saturated), 0);
        let faulted = ChainInputs { now_ms: 2, raw_signal: Some(0), runaway_faulted: true, limits };
        prop_assert_eq!(chain.apply(raw, &faulted), 0);
    }

    #[test]
    fn slew_output_is_bounded_and_non_negative(requests in proptest::collection::vec(any::<i32>(), 1..50), step in 1i32..500) {
        let output = OutputCfg { slew_limit_x10w: Some(step), ..OutputCfg::default() };
        let mut chain = OutputSafetyChain::new(&output, &KeepAwakeCfg::default());
        let mut last = 0i32;
        for r in requests {
            let out = chain.apply(r, &ChainInputs { now_ms: 0, raw_signal: Some(0), runaway_faulted: false, limits: SafetyLimits::default() });
            prop_assert!(out >= 0);
            prop_assert!(out <= last.saturating_add(step));
            last = out;
        }
    }

    #[test]
    fn steady_progress_never_trips(start in 11i32..300, step_c in 11i32..40, period_ms in 1u64..20_000, n in 1usize..100) {
        let mut d = ThermalRunawayDetector::new(&RunawayCfg::default());
        let mut t = start;
        for i in 0..n {
            d.observe(t, 500, i as u64 * period_ms);
            t = t.saturating_add(step_c).min(i32::from(i16::MAX));
        }
        prop_assert!(!d.is_faulted());
    }

    #[test]
    fn once_faulted_always_faulted(inputs in proptest::collection::vec((any::<i16>(), any::<i16>(), 0u64..1_000), 0..50)) {
        let mut d = ThermalRunawayDetector::new(&RunawayCfg::default());
        d.observe(0, 100, 0);
        d.observe(0, 100, 20_001);
        prop_assert!(d.is_faulted());
        let mut now = 20_001u64;
        for (m, e, dt) in inputs {
            now += dt;
            prop_assert!(!d.observe(i32::from(m), i32::from(e), now));
            prop_assert!(d.is_faulted());
        }
    }
}
