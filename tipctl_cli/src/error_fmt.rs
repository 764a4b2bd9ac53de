//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_RUN;
use tipctl_core::error::{AbortReason, BuildError, ControlError};

pub fn abort_reason_name(r: AbortReason) -> &'static str {
    match r {
        AbortReason::ThermalRunaway => "ThermalRunaway",
        AbortReason::SamplingStalled => "SamplingStalled",
    }
}

fn abort_reason_of(err: &eyre::Report) -> Option<AbortReason> {
    match err.downcast_ref::<ControlError>() {
        Some(ControlError::Abort(reason)) => Some(*reason),
        _ => None,
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No tip sensor was provided to the control loop.\nLikely causes: The sensor failed to initialize or was not wired into the builder.\nHow to fix: Pass the sensor via with_sensor(...).".to_string()
            }
            BuildError::MissingHeater => {
                "What happened: No heater was provided to the control loop.\nLikely causes: The heater driver failed to initialize or was not wired into the builder.\nHow to fix: Pass the heater via with_heater(...).".to_string()
            }
            BuildError::MissingWatchdog => {
                "What happened: No watchdog was provided to the control loop.\nLikely causes: The watchdog was not wired into the builder.\nHow to fix: Pass the watchdog via with_watchdog(...).".to_string()
            }
            BuildError::MissingTicks => {
                "What happened: No tick source was provided to the control loop.\nLikely causes: The sampling notifier/waiter pair was not created.\nHow to fix: Create one with tick_channel() and pass the waiter via with_ticks(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::Abort(AbortReason::ThermalRunaway) => "What happened: Thermal runaway detected; the heater output is locked off.\nLikely causes: Open heater circuit, tip not seated, or a detached temperature sensor.\nHow to fix: Remove power, check the tip and heater wiring, then restart. Tune runaway.threshold_c/timeout_ms only if the tip is genuinely slow.".to_string(),
            ControlError::Abort(AbortReason::SamplingStalled) => "What happened: Sampling ticks stopped arriving; the heater output was disabled.\nLikely causes: The ADC or sampling thread stalled.\nHow to fix: Check the sampling source; raise timeouts.tick_ms if ticks are just slow.".to_string(),
            ControlError::Timeout => "What happened: Tip temperature read timed out.\nLikely causes: ADC not responding or sensor wiring fault.\nHow to fix: Check the tip connection and sensor front end.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the --config path. Original: {msg}"
        );
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        let cause = te.message();
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Syntax error, unknown value type, or a typo in a key.\nHow to fix: Fix the TOML and try again. Cause: {cause}"
        );
    }

    if lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid ({cause}).\nLikely causes: Out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 thermal runaway, 3 sampling stalled, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match abort_reason_of(err) {
        Some(AbortReason::ThermalRunaway) => 2,
        Some(AbortReason::SamplingStalled) => 3,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(reason) = abort_reason_of(err) {
        let msg = humanize(err);
        let details = LAST_RUN.get().map(|r| match reason {
            AbortReason::ThermalRunaway => json!({
                "target_c": r.target_c,
                "threshold_c": r.runaway_threshold_c,
                "timeout_ms": r.runaway_timeout_ms,
            }),
            AbortReason::SamplingStalled => json!({ "tick_ms": r.tick_ms }),
        });
        let obj = match details {
            Some(d) => json!({ "reason": abort_reason_name(reason), "details": d, "message": msg }),
            None => json!({ "reason": abort_reason_name(reason), "message": msg }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_reasons_map_to_stable_codes() {
        let runaway = eyre::Report::new(ControlError::Abort(AbortReason::ThermalRunaway));
        let stall = eyre::Report::new(ControlError::Abort(AbortReason::SamplingStalled));
        let other = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&runaway), 2);
        assert_eq!(exit_code_for_error(&stall), 3);
        assert_eq!(exit_code_for_error(&other), 1);
    }

    #[test]
    fn json_error_names_the_reason() {
        let runaway = eyre::Report::new(ControlError::Abort(AbortReason::ThermalRunaway));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&runaway)).unwrap();
        assert_eq!(v["reason"], "ThermalRunaway");
        assert!(v["message"].as_str().unwrap().contains("Thermal runaway"));
    }

    #[test]
    fn build_errors_are_explained() {
        let e = eyre::Report::new(BuildError::InvalidConfig("tick_ms must be >= 1"));
        assert!(humanize(&e).contains("tick_ms must be >= 1"));
    }
}
