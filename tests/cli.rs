use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp config");
    tmp.write_all(json.as_bytes()).expect("write config");
    tmp
}

#[test]
fn summary_applies_held_keys() {
    let mut cmd = Command::cargo_bin("gallery-walkthrough").expect("binary exists");
    cmd.args(["--summary-only", "--frames", "1", "--hold", "W"]);
    cmd.assert()
        .success()
        .stdout(contains("Gallery 12.0 x 16.0"))
        .stdout(contains(" - actor x1"))
        .stdout(contains(" - glass x1"))
        .stdout(contains("frame 1 camera (0.00, 1.60, 5.90)"));
}

#[test]
fn summary_reads_json_overrides() {
    let config = write_config(r#"{ "sun": { "map_size": 512 } }"#);
    let mut cmd = Command::cargo_bin("gallery-walkthrough").expect("binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .args(["--summary-only", "--frames", "0"]);
    cmd.assert()
        .success()
        .stdout(contains(" - sun shadow 512px"))
        .stdout(contains(" - window shadow 2048px"))
        .stdout(contains("frame 0 camera (0.00, 1.60, 6.00)"));
}

#[test]
fn zero_sized_shadow_target_is_fatal() {
    let config = write_config(r#"{ "window_light": { "map_size": 0 } }"#);
    let mut cmd = Command::cargo_bin("gallery-walkthrough").expect("binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .arg("--summary-only");
    cmd.assert().failure().code(1);
}

#[test]
fn unknown_flag_is_rejected() {
    let mut cmd = Command::cargo_bin("gallery-walkthrough").expect("binary exists");
    cmd.arg("--fullscreen");
    cmd.assert().failure().code(1);
}
