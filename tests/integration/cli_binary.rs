//! Binary behaviour through `assert_cmd`

use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("miso-data-downloader").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_fuel_mix_today_fails() {
    let output = cli().args(["fuel-mix", "--today"]).output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("today data is not available for fuel mix"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_missing_date_mode_fails() {
    let output = cli().arg("load").output().unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid date specification"), "stderr: {stderr}");
}

#[test]
fn test_conflicting_date_modes_rejected_by_parser() {
    cli()
        .args(["load", "--latest", "--today"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_reports_lists_candidate_files() {
    let output = cli()
        .args([
            "--base-url",
            "http://127.0.0.1:9",
            "--format",
            "json",
            "reports",
            "--date",
            "2021-01-31",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(
        entries[0]["unarchived"],
        "http://127.0.0.1:9/marketreports/20210201_df_al.xls"
    );
    assert_eq!(
        entries[0]["archived"],
        "http://127.0.0.1:9/marketreports/202102_df_al_xls.zip"
    );
    assert!(entries[0]["resolved"].is_null());
}

#[test]
fn test_unreachable_host_fails_after_attempts() {
    cli()
        .args([
            "--base-url",
            "http://127.0.0.1:9",
            "--max-attempts",
            "1",
            "dayahead-lmp",
            "--start",
            "2021-01-01",
            "--end",
            "2021-01-01",
        ])
        .assert()
        .failure()
        .code(1);
}
