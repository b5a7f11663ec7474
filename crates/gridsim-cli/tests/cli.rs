use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn network(name: &str) -> String {
    repo_path(&format!("test_data/networks/{name}"))
        .to_str()
        .unwrap()
        .to_string()
}

fn gridsim() -> Command {
    Command::cargo_bin("gridsim").unwrap()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn simulate_prints_converged_response() {
    let output = gridsim()
        .args(["simulate", &network("two_bus_feeder.json")])
        .assert()
        .success()
        .get_output()
        .clone();
    let response = stdout_json(&output);
    assert_eq!(response["summary"]["converged"], true);
    assert_eq!(response["summary"]["slack_bus_id"], "bus-1");
    assert!(response["bus_by_id"]["bus-2"]["vm_pu"].as_f64().unwrap() < 1.02);
    assert!(response.get("network").is_none());
}

#[test]
fn simulate_writes_compact_file() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("results/response.json");
    gridsim()
        .args([
            "simulate",
            &network("mv_lv_substation.json"),
            "-o",
            out.to_str().unwrap(),
            "--compact",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.trim_end().lines().count(), 1);
    let response: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(response["summary"]["converged"], true);
    assert!(response["results"]["trafos"]["t1"]["loading_percent"].is_number());
    assert!(response["results"]["sgens"]["pv"].is_object());
    assert!(response["results"]["lines"]["edge_0"].is_object());
    assert_eq!(response["network"]["meta"]["converged"], true);
}

#[test]
fn simulate_reads_stdin_and_applies_flags() {
    let request = fs::read_to_string(network("two_bus_feeder.json")).unwrap();
    let output = gridsim()
        .args(["simulate", "-", "--algorithm", "fdbx", "--return-network", "tables"])
        .write_stdin(request)
        .assert()
        .success()
        .get_output()
        .clone();
    let response = stdout_json(&output);
    assert_eq!(response["summary"]["converged"], true);
    assert!(response["network"]["tables"]["bus"].is_array());
}

#[test]
fn simulate_reports_errors_in_the_response() {
    let output = gridsim()
        .args(["simulate", &network("no_ext_grid.json")])
        .assert()
        .success()
        .get_output()
        .clone();
    let response = stdout_json(&output);
    assert_eq!(response["summary"]["converged"], false);
    let validation = response["errors"]["validation"].as_array().unwrap();
    assert!(validation
        .iter()
        .any(|e| e["message"] == "At least one ext_grid is required"));
}

#[test]
fn simulate_fails_on_missing_file() {
    gridsim()
        .args(["simulate", "/no/such/request.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/no/such/request.json"));
}

#[test]
fn config_limits_flag_violations() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("gridsim.toml");
    fs::write(
        &config,
        "[limits]\nmin_vm_pu = 1.019\n\n[output]\npretty = false\n",
    )
    .unwrap();
    let output = gridsim()
        .args([
            "simulate",
            &network("two_bus_feeder.json"),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .clone();
    let response = stdout_json(&output);
    assert_eq!(response["element_status"]["bus-2"]["success"], false);
    let warnings = response["warnings"].as_array().unwrap();
    assert!(warnings
        .iter()
        .any(|w| w.as_str().unwrap().starts_with("[voltage] bus-2: vm_pu")));
}

#[test]
fn bad_config_is_rejected() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("gridsim.toml");
    fs::write(&config, "[solver]\nalgorithm = \"bfsw\"\n").unwrap();
    gridsim()
        .args([
            "simulate",
            &network("two_bus_feeder.json"),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bfsw"));
}

#[test]
fn validate_accepts_good_network() {
    let output = gridsim()
        .args(["validate", &network("two_bus_feeder.json")])
        .assert()
        .code(0)
        .get_output()
        .clone();
    let report = stdout_json(&output);
    assert_eq!(report["valid"], true);
    assert_eq!(report["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn validate_exits_two_on_findings() {
    let output = gridsim()
        .args(["validate", &network("no_ext_grid.json")])
        .assert()
        .code(2)
        .get_output()
        .clone();
    let report = stdout_json(&output);
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"][0]["element_type"], "network");
}

#[test]
fn std_types_lists_one_family() {
    let output = gridsim()
        .args(["std-types", "--kind", "trafo"])
        .assert()
        .success()
        .get_output()
        .clone();
    let library = stdout_json(&output);
    assert!(library.get("line").is_none());
    let trafo = &library["trafo"]["0.4 MVA 20/0.4 kV"];
    assert_eq!(trafo["vn_lv_kv"], 0.4);
}

#[test]
fn std_types_lists_everything_by_default() {
    gridsim()
        .arg("std-types")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAYY 4x150 SE"))
        .stdout(predicate::str::contains("63/25/38 MVA 110/20/10 kV"));
}
