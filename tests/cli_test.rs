//! Operator CLI against the shipped sample configuration.

use std::process::{Command, Output};

use serde_json::Value;

mod common;
use common::{access_claims, mint_token, GATEWAY_PRIVATE, GATEWAY_PUBLIC, OTHER_PRIVATE};

const SAMPLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/gateway.toml");

fn cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gateway-cli"))
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_clear()
        .env("RSA_PUBLIC_KEY", GATEWAY_PUBLIC)
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_check_lists_compiled_routes() {
    let output = cli(&["check", SAMPLE]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{stdout}");
    assert!(stdout.starts_with("configuration OK: 5 route pattern(s)"), "{stdout}");
    assert!(stdout.contains("/api/collab/**"), "{stdout}");
    assert!(!stdout.contains("warning:"), "{stdout}");
}

#[test]
fn test_check_fails_without_key() {
    let output = Command::new(env!("CARGO_BIN_EXE_gateway-cli"))
        .args(["check", SAMPLE])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_clear()
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("RSA_PUBLIC_KEY"));
}

#[test]
fn test_resolve_reports_route_and_policy() {
    let output = cli(&["resolve", SAMPLE, "/api/collab/boards/3"]);
    assert!(output.status.success());
    let decision = stdout_json(&output);
    assert_eq!(decision["route"], "collab-service");
    assert_eq!(decision["upstream_path"], "/api/boards/3");
    assert_eq!(decision["requires_auth"], true);
    assert_eq!(decision["public"], false);

    let output = cli(&["resolve", SAMPLE, "/api/auth/login"]);
    assert!(output.status.success());
    let decision = stdout_json(&output);
    assert_eq!(decision["route"], "user-service");
    assert_eq!(decision["requires_auth"], false);
    assert_eq!(decision["public"], true);
}

#[test]
fn test_resolve_unmatched_and_ambiguous_paths_fail() {
    let output = cli(&["resolve", SAMPLE, "/nowhere"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["route"], Value::Null);

    let output = cli(&["resolve", SAMPLE, "/api/auth/../users/me"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["rejected"], "INVALID_REQUEST_PATH");
}

#[test]
fn test_verify_prints_claims() {
    let token = mint_token(GATEWAY_PRIVATE, &access_claims("alice", Some("ADMIN")));
    let output = cli(&["verify", SAMPLE, &token]);

    assert!(output.status.success());
    let claims = stdout_json(&output);
    assert_eq!(claims["sub"], "alice");
    assert_eq!(claims["role"], "ADMIN");
    assert_eq!(claims["tokenType"], "ACCESS");
}

#[test]
fn test_verify_reports_failure_reason() {
    let token = mint_token(OTHER_PRIVATE, &access_claims("alice", None));
    let output = cli(&["verify", SAMPLE, &token]);

    assert!(!output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["valid"], false);
    assert_eq!(result["reason"], "invalid_signature");

    let output = cli(&["verify", SAMPLE, "not-a-token"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["reason"], "malformed_token");
}
