use assert_cmd::Command;
use predicates::prelude::*;
use serde::Deserialize;
use std::error::Error;
use tempfile::tempdir;

#[derive(Deserialize)]
struct ResultRecord {
    index: usize,
    kind: String,
    status: i32,
    id: u32,
    value: f32,
}

fn neurogate() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("neurogate")?;
    cmd.env_remove("RUST_LOG").env_remove("NEUROGATE_CONFIG");
    Ok(cmd)
}

fn parse_lines(stdout: &[u8]) -> Result<Vec<ResultRecord>, Box<dyn Error>> {
    let text = std::str::from_utf8(stdout)?;
    let mut records = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        records.push(serde_json::from_str(line)?);
    }
    Ok(records)
}

const SCRIPT: &str = r#"
[[commands]]
kind = "create_neuron"
neuron_id = 1
neuron_type = "excitatory"
activation = "sigmoid"

[[commands]]
kind = "create_neuron"
neuron_id = 2
neuron_type = "excitatory"
activation = "sigmoid"

[[commands]]
kind = "connect_neurons"
neuron_id = 1
target_id = 2

[[commands]]
kind = "create_synapse"
synapse_id = 100
neuron_id = 1
target_id = 2
synapse_type = "excitatory"

[[commands]]
kind = "set_neuron_param"
neuron_id = 1
parameter = "potential"
value = -40.0

[[commands]]
kind = "run_simulation"
time_step = 1.0
num_steps = 1

[[commands]]
kind = "get_neuron_state"
neuron_id = 2

[[commands]]
kind = "get_neuron_state"
neuron_id = 99
"#;

#[test]
fn run_toml_script_prints_one_line_per_command() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let script = tmp.path().join("network.toml");
    std::fs::write(&script, SCRIPT)?;

    let output = neurogate()?.arg("run").arg(&script).output()?;
    assert!(output.status.success());

    let records = parse_lines(&output.stdout)?;
    assert_eq!(records.len(), 8);
    assert!(records.iter().take(7).all(|r| r.status == 0));
    assert_eq!(records[3].kind, "create_synapse");
    assert_eq!(records[3].id, 100);
    assert_eq!(records[5].value, 1.0);
    assert_eq!(records[6].id, 2);
    assert!((records[6].value - -69.55).abs() < 1e-4);
    assert_eq!(records[7].index, 7);
    assert_eq!(records[7].status, -1);
    Ok(())
}

#[test]
fn run_over_frames_matches_direct_dispatch() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let script = tmp.path().join("network.toml");
    std::fs::write(&script, SCRIPT)?;

    let direct = neurogate()?.arg("run").arg(&script).output()?;
    let framed = neurogate()?
        .args(["run", "--frames"])
        .arg(&script)
        .output()?;
    assert!(framed.status.success());
    assert_eq!(direct.stdout, framed.stdout);
    Ok(())
}

#[test]
fn run_json_script_strict_fails_on_error() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let script = tmp.path().join("script.json");
    std::fs::write(
        &script,
        r#"{"commands":[{"kind":"shutdown"},{"kind":"get_memory_stats"}]}"#,
    )?;

    neurogate()?.arg("run").arg(&script).assert().success();
    neurogate()?
        .args(["run", "--strict"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 commands failed"));
    Ok(())
}

#[test]
fn run_missing_script_fails() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    neurogate()?
        .arg("run")
        .arg(tmp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading script"));
    Ok(())
}

#[test]
fn scenario_reports_spike_on_second_step() -> Result<(), Box<dyn Error>> {
    neurogate()?
        .args(["scenario", "--steps", "2", "--input", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""step":2"#))
        .stdout(predicate::str::contains(r#""source_fired":true"#));

    neurogate()?
        .args(["scenario", "--steps", "5", "--input", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""source_fired":true"#).not());
    Ok(())
}

#[test]
fn config_file_limits_capacity() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let config = tmp.path().join("neurogate.toml");
    std::fs::write(&config, "[runtime.arena]\nbyte_limit = 64\n")?;

    // The initial tables alone exceed 64 bytes
    neurogate()?
        .arg("--config")
        .arg(&config)
        .args(["scenario", "--steps", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Runtime error"));

    neurogate()?
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("byte_limit = 64"));
    Ok(())
}

#[test]
fn config_defaults_round_trip() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let out = tmp.path().join("written.toml");

    neurogate()?
        .args(["config", "--defaults", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("initial_neuron_capacity = 100"));
    assert!(out.exists());

    neurogate()?
        .arg("--config")
        .arg(&out)
        .args(["scenario", "--steps", "1"])
        .assert()
        .success();
    Ok(())
}
