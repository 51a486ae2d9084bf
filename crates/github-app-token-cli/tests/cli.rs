//! End-to-end tests for the `github-app-token` binary.

use assert_cmd::prelude::*;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::{Command, Output};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../github-app-token/tests/fixtures")
        .join(name)
}

fn key_path() -> String {
    fixture("app-key.pem").display().to_string()
}

fn command() -> Command {
    let mut command = Command::cargo_bin("github-app-token").unwrap();
    command
        .env_remove("GITHUB_APP_TOKEN_CONFIG")
        .env_remove("RUST_LOG");
    command
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || command().args(args).output().unwrap())
        .await
        .unwrap()
}

#[test]
fn test_prints_app_token() {
    let output = command()
        .args(["-id", "123", "-private-key", key_path().as_str()])
        .output()
        .unwrap();
    output.clone().assert().success();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);

    let public_key = std::fs::read(fixture("app-key.pub.pem")).unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let claims = decode::<Value>(
        stdout.trim_end(),
        &DecodingKey::from_rsa_pem(&public_key).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(claims["iss"], json!("123"));
    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        60
    );
}

#[test]
fn test_liveness_flag_sets_window() {
    let output = command()
        .args(["--id=123", "--private-key", key_path().as_str(), "-liveness=5m"])
        .output()
        .unwrap();
    output.clone().assert().success();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let public_key = std::fs::read(fixture("app-key.pub.pem")).unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    let claims = decode::<Value>(
        stdout.trim_end(),
        &DecodingKey::from_rsa_pem(&public_key).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(
        claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
        300
    );
}

#[tokio::test]
async fn test_prints_installation_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/installation"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 999 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/app/installations/999/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_abc",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_blocking(vec![
        "-id".into(),
        "123".into(),
        "-private-key".into(),
        key_path(),
        "-repo".into(),
        "acme/widgets".into(),
        "-api-url".into(),
        server.uri(),
    ])
    .await;

    output.assert().success().stdout("ghs_abc\n");
}

#[tokio::test]
async fn test_malformed_repository_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_blocking(vec![
        "-id".into(),
        "123".into(),
        "-private-key".into(),
        key_path(),
        "-repo=acmewidgets".into(),
        "-api-url".into(),
        server.uri(),
    ])
    .await;

    output
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains(
            "malformed repository name: acmewidgets",
        ));
}

#[tokio::test]
async fn test_missing_installation_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/installation"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = run_blocking(vec![
        "-id".into(),
        "123".into(),
        "-private-key".into(),
        key_path(),
        "-repo".into(),
        "acme/widgets".into(),
        "-api-url".into(),
        server.uri(),
    ])
    .await;

    output
        .assert()
        .code(6)
        .stdout("")
        .stderr(predicate::str::contains("generate installation token"))
        .stderr(predicate::str::contains("acme/widgets"));
}

#[test]
fn test_missing_id_is_usage_error() {
    command()
        .args(["-private-key", key_path().as_str()])
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("-id is required"));
}

#[test]
fn test_missing_private_key_is_usage_error() {
    command()
        .args(["-id", "123"])
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("-private-key is required"));
}

#[test]
fn test_unreadable_key_file() {
    command()
        .args(["-id", "123", "-private-key", "/nonexistent/app.pem"])
        .assert()
        .code(4)
        .stdout("")
        .stderr(predicate::str::contains("generate app token"));
}

#[test]
fn test_help() {
    command()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("--private-key"));
}

#[test]
fn test_configuration_file_supplies_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("app-token.toml");
    std::fs::write(
        &config,
        format!(
            "app_id = 123\nprivate_key = {:?}\n",
            fixture("app-key.pem").display().to_string()
        ),
    )
    .unwrap();

    command()
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[\w-]+\.[\w-]+\.[\w-]+\n$").unwrap());
}
