use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn fast_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        "[control]\nloop_hz = 50\n[timeouts]\ntick_ms = 50\nwarmup_reads = 4\n[runaway]\ntimeout_ms = 200\n",
    )
    .unwrap();
    path
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or_else(|| panic!("no JSON line in stdout: {text}"));
    serde_json::from_str(line).unwrap()
}

#[rstest]
fn summary_is_json() {
    let dir = tempdir().unwrap();
    let cfg = fast_config(&dir);
    let out = Command::cargo_bin("tipctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--target-c", "300", "--duration-ms", "300"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v = last_json_line(&out.stdout);
    assert_eq!(v["end"], "elapsed");
    assert_eq!(v["thermal_runaway"], false);
    assert!(v["cycles"].as_u64().unwrap() > 0);
    assert!(v["final_temp_c"].as_f64().unwrap() > 25.0);
}

#[rstest]
#[case(&["--open-heater"], 2, "ThermalRunaway", "timeout_ms")]
#[case(&["--stall-after-ms", "100"], 3, "SamplingStalled", "tick_ms")]
fn abort_errors_are_json(
    #[case] extra: &[&str],
    #[case] code: i32,
    #[case] reason: &str,
    #[case] detail_key: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = fast_config(&dir);
    let out = Command::cargo_bin("tipctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--target-c", "320", "--duration-ms", "5000"])
        .args(extra)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(code));
    let v = last_json_line(&out.stdout);
    assert_eq!(v["reason"], reason);
    assert!(v["details"].get(detail_key).is_some(), "{v}");
    assert!(v["message"].as_str().unwrap().starts_with("What happened"));
}
