use anyhow::{Context, Result};
use serde_json::Value;
use std::process::{Command, Output};
use tempfile::tempdir;

fn pacerctl(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_pacerctl"))
        .args(args)
        .output()
        .context("spawn pacerctl")
}

fn burst_json(args: &[&str]) -> Result<Value> {
    let mut full = vec!["burst", "--json"];
    full.extend_from_slice(args);
    let out = pacerctl(&full)?;
    if !out.status.success() {
        anyhow::bail!("pacerctl failed: {}", String::from_utf8_lossy(&out.stderr));
    }
    Ok(serde_json::from_slice(&out.stdout)?)
}

fn waits(round: &Value) -> Vec<u64> {
    let mut waits = round["admissions"]
        .as_array()
        .map(|items| items.iter().filter_map(|a| a["wait_ms"].as_u64()).collect::<Vec<_>>())
        .unwrap_or_default();
    waits.sort_unstable();
    waits
}

#[test]
fn burst_over_limit_waits_for_next_window() -> Result<()> {
    let report = burst_json(&["--interval-ms", "200", "--max-limit", "2", "--count", "3"])?;
    let round = &report["rounds"][0];
    let waits = waits(round);
    assert_eq!(waits.len(), 3);
    assert_eq!(&waits[..2], &[0, 0]);
    assert!(waits[2] >= 150 && waits[2] <= 201, "unexpected wait {}", waits[2]);
    assert_eq!(round["snapshot"]["multiplier"], 0);
    Ok(())
}

#[test]
fn oversized_weight_is_reported() -> Result<()> {
    let report = burst_json(&[
        "--interval-ms",
        "100",
        "--max-limit",
        "5",
        "--max-weight",
        "5",
        "--weight",
        "10",
        "--count",
        "1",
    ])?;
    let admission = &report["rounds"][0]["admissions"][0];
    assert!(admission["wait_ms"].is_null());
    let error = admission["error"].as_str().context("error message")?;
    assert!(error.contains("exceeds max weight"));
    Ok(())
}

#[test]
fn rounds_repeat_after_drain() -> Result<()> {
    let report = burst_json(&[
        "--interval-ms",
        "100",
        "--max-limit",
        "4",
        "--count",
        "4",
        "--rounds",
        "2",
    ])?;
    let rounds = report["rounds"].as_array().context("rounds")?;
    assert_eq!(rounds.len(), 2);
    for round in rounds {
        assert_eq!(waits(round), vec![0, 0, 0, 0]);
    }
    Ok(())
}

#[test]
fn burst_uses_named_limiter_from_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("limits.toml");
    std::fs::write(&path, "[limiters.api]\ninterval_ms = 1000\nmax_limit = 3\n")?;
    let path = path.to_string_lossy().to_string();

    let report = burst_json(&["--config", &path, "--name", "api", "--count", "3"])?;
    assert_eq!(report["config"]["max_limit"], 3);
    assert_eq!(waits(&report["rounds"][0]), vec![0, 0, 0]);

    let out = pacerctl(&["burst", "--config", &path, "--name", "missing"])?;
    assert!(!out.status.success());
    Ok(())
}

#[test]
fn check_lists_limiters() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("limits.toml");
    std::fs::write(
        &path,
        "[limiters.api]\ninterval_ms = 1000\nmax_limit = 10\nmax_weight = 100\n\n[limiters.jobs]\ninterval_ms = 60000\nmax_limit = 5\n",
    )?;
    let out = pacerctl(&["check", "--config", &path.to_string_lossy()])?;
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.contains("api: 10 per 1000ms, max weight 100"));
    assert!(stdout.contains("jobs: 5 per 60000ms"));

    std::fs::write(&path, "[limiters.bad]\ninterval_ms = 0\nmax_limit = 1\n")?;
    let out = pacerctl(&["check", "--config", &path.to_string_lossy()])?;
    assert!(!out.status.success());
    Ok(())
}
