use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal valid TOML config for sim mode
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[monitor]
interval_ms = 5
sample_size = 4

[session]
# no OS notifications in sim builds, keep the flag off anyway
watch = false
"#;
    let path = dir.path().join("lockguard.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn lockguard(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("lockguard").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("LOCKGUARD_SIM_RANGES")
        .env_remove("LOCKGUARD_SIM_CLOSE_AFTER")
        .env_remove("LOCKGUARD_SIM_BADGE")
        .env_remove("LOCKGUARD_SIM_NO_DEVICE")
        .arg("--config")
        .arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], &[], 0, "Usage:", "stdout")]
#[case(&["self-check"], &[], 0, "OK", "stdout")]
#[case(&["self-check"], &[("LOCKGUARD_SIM_BADGE", "1")], 0, "badge: present", "stdout")]
#[case(&["self-check"], &[("LOCKGUARD_SIM_RANGES", "-1")], 0, "no echo", "stdout")]
#[case(&["self-check"], &[("LOCKGUARD_SIM_NO_DEVICE", "1")], 2, "did not answer", "stderr")]
#[case(&["guard"], &[("LOCKGUARD_SIM_NO_DEVICE", "1")], 2, "did not answer", "stderr")]
#[case(&["guard"], &[("LOCKGUARD_SIM_CLOSE_AFTER", "3")], 3, "Abort", "stdout")]
#[case(&["guard"], &[("LOCKGUARD_SIM_CLOSE_AFTER", "3")], 3, "locked as a precaution", "stderr")]
#[case(&["guard", "--sample-size", "0"], &[], 4, "Invalid monitor settings", "stderr")]
#[case(&["guard", "--sample-size", "4000000000000000000"], &[], 4, "Invalid monitor settings", "stderr")]
#[case(&["guard", "--threshold-cm", "5000"], &[], 4, "Invalid monitor settings", "stderr")]
#[case(&["guard"], &[("LOCKGUARD_SIM_RANGES", "90,far")], 4, "Configuration is invalid", "stderr")]
#[case(&["calibrate"], &[("LOCKGUARD_SIM_CLOSE_AFTER", "0")], 3, "closed", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] env: &[(&str, &str)],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = lockguard(&cfg);
    for (k, v) in env {
        cmd.env(k, v);
    }
    if args.first().copied() == Some("calibrate") {
        cmd.args(["calibrate", "--yes", "--rest-ms", "0", "--away-delay-s", "0"]);
    } else {
        cmd.args(args);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case::threshold_above_tolerance("[monitor]\nthreshold_cm = 2000.0\n")]
#[case::zero_interval("[monitor]\ninterval_ms = 0\n")]
#[case::unknown_rotation("[logging]\nrotation = \"weekly\"\n")]
#[case::oversized_window("[monitor]\nsample_size = 4000000000000000000\n")]
#[case::wrong_type("[monitor]\nsample_size = \"twelve\"\n")]
fn invalid_config_exits_with_4(#[case] toml: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    lockguard(&cfg)
        .arg("self-check")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn calibrate_rejects_oversized_sample_count() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    lockguard(&cfg)
        .args(["calibrate", "--yes", "--samples", "4000000000000000000"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--samples must be <= 4096"));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("absent.toml");

    lockguard(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("range: 90 cm"));
    assert!(!cfg.exists(), "self-check must not create the config");
}

#[test]
fn calibrate_writes_thresholds_into_the_config() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("lockguard.toml");
    fs::write(&cfg, "[device]\nport = \"/dev/ttyACM0\"\n\n[monitor]\nsample_size = 8\n").unwrap();

    lockguard(&cfg)
        .env("LOCKGUARD_SIM_RANGES", "90,90,90,90,300,300,300,300")
        .args([
            "calibrate",
            "--samples",
            "4",
            "--rest-ms",
            "0",
            "--away-delay-s",
            "0",
            "--yes",
            "--write",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Seated distance: 90.0 cm"))
        .stdout(predicate::str::contains("threshold_cm = 140.0"));

    let stored = lockguard_config::load_toml(&fs::read_to_string(&cfg).unwrap()).unwrap();
    assert_eq!(stored.monitor.threshold_cm, 140.0);
    assert_eq!(stored.monitor.max_tolerance_cm, 300.0);
    assert_eq!(stored.monitor.sample_size, 8, "other keys survive");
    assert_eq!(stored.device.port.as_deref(), Some("/dev/ttyACM0"));
    stored.validate().unwrap();
}

#[test]
fn calibrate_without_write_leaves_the_file_alone() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let before = fs::read_to_string(&cfg).unwrap();

    lockguard(&cfg)
        .env("LOCKGUARD_SIM_RANGES", "80,80,400,400")
        .args([
            "calibrate",
            "--samples",
            "2",
            "--rest-ms",
            "0",
            "--away-delay-s",
            "0",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_tolerance_cm = 400.0"));

    assert_eq!(fs::read_to_string(&cfg).unwrap(), before);
}

#[test]
fn log_file_receives_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("lockguard.log");
    let cfg = dir.path().join("lockguard.toml");
    fs::write(
        &cfg,
        format!(
            "[logging]\nfile = {:?}\nlevel = \"info\"\n",
            log.to_string_lossy()
        ),
    )
    .unwrap();

    lockguard(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg("self-check")
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    let line = text
        .lines()
        .find(|l| l.contains("self-check passed"))
        .unwrap_or_else(|| panic!("no self-check line in log: {text}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["fields"]["range_cm"], 90);
}
