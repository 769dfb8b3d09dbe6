use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_config(dir: &Path, base_url: &str) {
    fs::write(
        dir.join("config.toml"),
        format!("base_url = \"{base_url}\"\n"),
    )
    .unwrap();
}

fn cli(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invflask-client").unwrap();
    cmd.env("INVFLASK_CLIENT_CONFIG_DIR", config_dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn show_prints_built_in_defaults() {
    let dir = tempdir().unwrap();

    cli(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config: built-in defaults"))
        .stdout(predicate::str::contains(
            "Base URL: https://invflask-connectorstech7925-12l4k6at.leapcell.dev/",
        ))
        .stdout(predicate::str::contains(
            "Header: content-type: application/json",
        ))
        .stdout(predicate::str::contains("Credentials: include"));
}

#[test]
fn show_reflects_config_file_overrides() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "base_url = \"http://127.0.0.1:5000\"\nwith_credentials = false\n",
    )
    .unwrap();

    cli(dir.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Base URL: http://127.0.0.1:5000/"))
        .stdout(predicate::str::contains("Credentials: omit"));
}

#[test]
fn request_prints_status_and_pretty_body() {
    let dir = tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/anything")
            .header("content-type", "application/json");
        then.status(200).json_body(json!({ "ok": true }));
    });
    write_config(dir.path(), &server.base_url());

    cli(dir.path())
        .args(["request", "get", "/anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains("200 OK"))
        .stdout(predicate::str::contains("\"ok\": true"));

    mock.assert();
}

#[test]
fn request_sends_data_and_extra_headers() {
    let dir = tempdir().unwrap();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/connectors")
            .header("x-tenant", "acme")
            .json_body(json!({ "name": "inventory" }));
        then.status(201).body("created");
    });
    write_config(dir.path(), &server.base_url());

    cli(dir.path())
        .args([
            "request",
            "POST",
            "/connectors",
            "--data",
            r#"{"name":"inventory"}"#,
            "-H",
            "X-Tenant: acme",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("201 Created"))
        .stdout(predicate::str::contains("created"));

    mock.assert();
}

#[test]
fn request_reports_error_status_without_failing() {
    let dir = tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });
    write_config(dir.path(), &server.base_url());

    cli(dir.path())
        .args(["request", "GET", "/missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("404 Not Found"));
}

#[test]
fn request_rejects_invalid_json_data() {
    let dir = tempdir().unwrap();

    cli(dir.path())
        .args(["request", "POST", "/connectors", "--data", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--data must be valid JSON"));
}

#[test]
fn malformed_config_file_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "base_url = [not toml").unwrap();

    cli(dir.path())
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"))
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn invalid_base_url_in_config_file_is_reported() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), "ftp://files.example.com");

    cli(dir.path())
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "base URL ftp://files.example.com is not an http(s) origin",
        ));
}
