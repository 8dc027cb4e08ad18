#![allow(deprecated)]
use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn cadence(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cadence").unwrap();
    cmd.current_dir(dir.path()).env("CADENCE_ROOT", dir.path());
    cmd
}

fn init_project(dir: &TempDir) {
    cadence(dir).arg("init").assert().success();
}

/// Point the LCO facility at `portal` with a throwaway credentials file.
fn configure_portal(dir: &TempDir, portal: &str) {
    let creds = dir.path().join("lco.json");
    std::fs::write(&creds, r#"{"lco_token": "test-token", "proposal_id": "KEY2020"}"#).unwrap();
    let config = format!(
        "submit_timeout_secs: 30\nlease_ttl_secs: 120\ntick_interval_secs: 3600\nfacilities:\n  LCO:\n    type: lco\n    portal_url: {portal}\n    credentials_file: {}\n",
        creds.display()
    );
    std::fs::write(dir.path().join(".cadence/config.yaml"), config).unwrap();
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Add an expired record with the given window to `group`; returns its id.
fn add_expired(dir: &TempDir, group: &str, observation_id: &str, start: &str, end: &str) -> String {
    let params = json!({
        "observation_type": "IMAGING",
        "name": "sn2023ixf",
        "start": start,
        "end": end,
    });
    let record = json_stdout(cadence(dir).args([
        "record",
        "add",
        "--target",
        "sn2023ixf",
        "--facility",
        "LCO",
        "--observation-id",
        observation_id,
        "--params",
        &params.to_string(),
        "--status",
        "WINDOW_EXPIRED",
        "--group",
        group,
    ]));
    record["id"].as_str().unwrap().to_string()
}

fn group_records(dir: &TempDir, group: &str) -> Vec<Value> {
    let shown = json_stdout(cadence(dir).args(["group", "show", group]));
    shown["records"].as_array().unwrap().clone()
}

// ---------------------------------------------------------------------------
// cadence init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_store() {
    let dir = TempDir::new().unwrap();
    cadence(&dir).arg("init").assert().success();

    assert!(dir.path().join(".cadence").is_dir());
    assert!(dir.path().join(".cadence/config.yaml").exists());
    assert!(dir.path().join(".cadence/cadence.db").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    cadence(&dir).arg("init").assert().success();
    cadence(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    cadence(&dir)
        .args(["group", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// groups, records, cadences
// ---------------------------------------------------------------------------

#[test]
fn group_create_and_list() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    cadence(&dir)
        .args(["group", "create", "sn2023ixf"])
        .assert()
        .success();
    cadence(&dir)
        .args(["group", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sn2023ixf"));
}

#[test]
fn group_create_invalid_or_duplicate_fails() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    cadence(&dir)
        .args(["group", "create", "Not A Slug"])
        .assert()
        .failure();
    cadence(&dir)
        .args(["group", "create", "m31"])
        .assert()
        .success();
    cadence(&dir)
        .args(["group", "create", "m31"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn record_membership_round_trip() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    cadence(&dir).args(["group", "create", "m31"]).assert().success();

    let id = add_expired(&dir, "m31", "198132", "2020-01-01T00:00:00", "2020-01-02T00:00:00");
    assert_eq!(group_records(&dir, "m31").len(), 1);

    cadence(&dir)
        .args(["record", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("198132"));

    cadence(&dir)
        .args(["group", "remove", "m31", &id])
        .assert()
        .success();
    assert!(group_records(&dir, "m31").is_empty());

    // The record outlives its membership.
    cadence(&dir)
        .args(["record", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("WINDOW_EXPIRED"));
}

#[test]
fn record_set_status_reports_terminal() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    cadence(&dir).args(["group", "create", "m31"]).assert().success();
    let id = add_expired(&dir, "m31", "1", "2020-01-01", "2020-01-02");

    let value = json_stdout(cadence(&dir).args(["record", "set-status", &id, "SCHEDULED"]));
    assert_eq!(value["status"], "SCHEDULED");
    assert_eq!(value["terminal"], false);
}

#[test]
fn cadence_requires_existing_group() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    cadence(&dir)
        .args(["cadence", "create", "m31-72h", "--group", "m31", "--frequency", "72"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("group not found"));
}

#[test]
fn cadence_pause_and_resume() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    cadence(&dir).args(["group", "create", "m31"]).assert().success();
    cadence(&dir)
        .args([
            "cadence", "create", "m31-72h", "--group", "m31", "--frequency", "72", "--param",
            "priority=2",
        ])
        .assert()
        .success();

    cadence(&dir)
        .args(["cadence", "pause", "m31-72h"])
        .assert()
        .success();
    let shown = json_stdout(cadence(&dir).args(["cadence", "show", "m31-72h"]));
    assert_eq!(shown["active"], false);
    assert_eq!(shown["parameters"]["cadence_frequency"], 72.0);
    assert_eq!(shown["parameters"]["priority"], 2);

    cadence(&dir)
        .args(["cadence", "resume", "m31-72h"])
        .assert()
        .success();
    cadence(&dir)
        .args(["cadence", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("active"));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_has_only_warnings() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    configure_portal(&dir, "https://observe.lco.global");

    cadence(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_zero_timeout() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(
        dir.path().join(".cadence/config.yaml"),
        "submit_timeout_secs: 0\nfacilities: {}\n",
    )
    .unwrap();

    cadence(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("submit_timeout_secs"));
}

// ---------------------------------------------------------------------------
// run / tick / sync against a mock portal
// ---------------------------------------------------------------------------

#[test]
fn run_without_frequency_fails_and_leaves_group() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let server = mockito::Server::new();
    configure_portal(&dir, &server.url());
    cadence(&dir).args(["group", "create", "m31"]).assert().success();
    cadence(&dir)
        .args(["cadence", "create", "m31-loose", "--group", "m31"])
        .assert()
        .success();
    add_expired(&dir, "m31", "1", "2020-01-01T00:00:00", "2020-01-02T00:00:00");

    cadence(&dir)
        .args(["run", "m31-loose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cadence_frequency"));

    assert_eq!(group_records(&dir, "m31").len(), 1);
}

#[test]
fn run_renews_expired_group_then_skips() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut server = mockito::Server::new();
    configure_portal(&dir, &server.url());

    let validate = server
        .mock("POST", "/api/requestgroups/validate/")
        .match_header("authorization", "Token test-token")
        .with_status(200)
        .with_body(r#"{"errors": {}}"#)
        .create();
    let submit = server
        .mock("POST", "/api/requestgroups/")
        .match_header("authorization", "Token test-token")
        .match_body(Matcher::PartialJson(json!({
            "start": "2020-01-04T00:00:00",
            "end": "2020-01-05T00:00:00",
        })))
        .with_status(201)
        .with_body(r#"{"id": 77, "requests": [{"id": 2001}]}"#)
        .expect(1)
        .create();

    cadence(&dir).args(["group", "create", "sn2023ixf"]).assert().success();
    cadence(&dir)
        .args([
            "cadence", "create", "sn2023ixf-72h", "--group", "sn2023ixf", "--frequency", "72",
        ])
        .assert()
        .success();
    for (i, day) in ["2019-12-20", "2019-12-23", "2019-12-26", "2019-12-29"]
        .iter()
        .enumerate()
    {
        add_expired(
            &dir,
            "sn2023ixf",
            &format!("10{i}"),
            &format!("{day}T00:00:00"),
            &format!("{day}T12:00:00"),
        );
    }
    add_expired(
        &dir,
        "sn2023ixf",
        "200",
        "2020-01-01T00:00:00",
        "2020-01-02T00:00:00",
    );

    let outcome = json_stdout(cadence(&dir).args(["run", "sn2023ixf-72h"]));
    assert_eq!(outcome["outcome"], "renewed");
    assert_eq!(outcome["records"][0]["observation_id"], "2001");
    assert_eq!(outcome["records"][0]["status"], "PENDING");

    let members = group_records(&dir, "sn2023ixf");
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["parameters"]["start"], "2020-01-04T00:00:00");
    assert_eq!(members[0]["parameters"]["end"], "2020-01-05T00:00:00");

    // The fresh record is pending, so the next run does nothing.
    let again = json_stdout(cadence(&dir).args(["run", "sn2023ixf-72h"]));
    assert_eq!(again["outcome"], "skipped");

    validate.assert();
    submit.assert();
}

#[test]
fn rejected_payload_leaves_group_unchanged() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut server = mockito::Server::new();
    configure_portal(&dir, &server.url());
    let _validate = server
        .mock("POST", "/api/requestgroups/validate/")
        .with_status(200)
        .with_body(r#"{"errors": {"requests": [{"windows": ["Window is in the past"]}]}}"#)
        .create();
    let submit = server
        .mock("POST", "/api/requestgroups/")
        .expect(0)
        .create();

    cadence(&dir).args(["group", "create", "m31"]).assert().success();
    cadence(&dir)
        .args(["cadence", "create", "m31-daily", "--group", "m31", "--frequency", "24"])
        .assert()
        .success();
    add_expired(&dir, "m31", "1", "2020-01-01T00:00:00", "2020-01-02T00:00:00");

    cadence(&dir)
        .args(["run", "m31-daily"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requests[0].windows"));

    assert_eq!(group_records(&dir, "m31").len(), 1);
    submit.assert();
}

#[test]
fn tick_reports_every_active_cadence() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let server = mockito::Server::new();
    configure_portal(&dir, &server.url());

    for slug in ["alpha", "beta"] {
        cadence(&dir).args(["group", "create", slug]).assert().success();
        cadence(&dir)
            .args(["cadence", "create", slug, "--group", slug, "--frequency", "24"])
            .assert()
            .success();
    }
    cadence(&dir).args(["cadence", "pause", "beta"]).assert().success();

    let report = json_stdout(cadence(&dir).arg("tick"));
    let runs = report.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["slug"], "alpha");
    assert_eq!(runs[0]["result"]["reason"], "empty_group");
}

#[test]
fn sync_pulls_state_from_portal() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut server = mockito::Server::new();
    configure_portal(&dir, &server.url());
    let status = server
        .mock("GET", "/api/requests/3001/")
        .match_header("authorization", "Token test-token")
        .with_status(200)
        .with_body(r#"{"id": 3001, "state": "COMPLETED"}"#)
        .create();

    cadence(&dir).args(["group", "create", "m31"]).assert().success();
    cadence(&dir)
        .args(["cadence", "create", "m31-daily", "--group", "m31", "--frequency", "24"])
        .assert()
        .success();
    let id = add_expired(&dir, "m31", "3001", "2020-01-01", "2020-01-02");
    cadence(&dir)
        .args(["record", "set-status", &id, "PENDING"])
        .assert()
        .success();

    let report = json_stdout(cadence(&dir).arg("sync"));
    assert_eq!(report["checked"], 1);
    assert_eq!(report["updated"], 1);
    status.assert();

    let members = group_records(&dir, "m31");
    assert_eq!(members[0]["status"], "COMPLETED");
}
