// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared helpers, fixtures, and utilities used across test modules.

#![allow(dead_code)]

pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use camlink_core::network::{HttpRequest, HttpResponse, MockConnector};
use camlink_core::{BatchDispatcher, ClientConfig, ManualClock};
use serde_json::{json, Value};

/// Camera address used by all fixtures.
pub const CAMERA_HOST: &str = "192.168.1.10";

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Plain-login config for the fixture camera over HTTP.
pub fn plain_config() -> ClientConfig {
    ClientConfig::new(CAMERA_HOST)
        .with_credentials("admin", "secret")
        .with_port(80)
        .without_encryption()
}

/// Same as [`plain_config`] with the digest handshake enabled.
pub fn encrypted_config() -> ClientConfig {
    let mut config = plain_config();
    config.encrypt = true;
    config
}

/// Dispatcher on a mock connector with a manual clock starting at t=1000s.
pub fn mock_dispatcher(
    config: ClientConfig,
) -> (BatchDispatcher<MockConnector>, MockConnector, ManualClock) {
    init_tracing();
    let mock = MockConnector::new();
    let clock = ManualClock::new(Duration::from_secs(1000));
    let dispatcher =
        BatchDispatcher::with_clock(config, mock.clone(), Arc::new(clock.clone())).unwrap();
    (dispatcher, mock, clock)
}

/// Successful login reply body.
pub fn login_reply(token: &str, lease_seconds: u64) -> Value {
    json!([{
        "cmd": "Login",
        "code": 0,
        "value": {"Token": {"name": token, "leaseTime": lease_seconds}}
    }])
}

/// `WWW-Authenticate` value the camera sends in reply to the login probe.
pub const DIGEST_CHALLENGE: &str =
    r#"Digest realm="Login to 952700Y4009F", nonce="abcdef", qop="auth", nc="00000001""#;

/// `401` probe reply carrying [`DIGEST_CHALLENGE`].
pub fn challenge_reply() -> HttpResponse {
    HttpResponse::new(401, "").with_header("WWW-Authenticate", DIGEST_CHALLENGE)
}

/// Digest login reply with a counter pool.
pub fn encrypted_login_reply(token: &str, check_basic: u64, count_total: usize) -> Value {
    json!([{
        "cmd": "Login",
        "code": 0,
        "value": {"Token": {
            "name": token,
            "leaseTime": 3600,
            "checkBasic": check_basic,
            "countTotal": count_total
        }}
    }])
}

/// Failed command reply body.
pub fn error_reply(cmd: &str, rsp_code: i64, detail: &str) -> Value {
    json!([{
        "cmd": cmd,
        "code": 1,
        "error": {"rspCode": rsp_code, "detail": detail}
    }])
}

/// Parses the JSON array body of a recorded request.
pub fn request_body(request: &HttpRequest) -> Vec<Value> {
    let body = request.body.as_deref().unwrap_or(b"[]");
    serde_json::from_slice(body).unwrap()
}

/// Replies to every command in the request body with a success object
/// echoing its `cmd` and parameters.
pub fn echo_handler(request: &HttpRequest) -> HttpResponse {
    let replies: Vec<Value> = request_body(request)
        .into_iter()
        .map(|cmd| {
            json!({
                "cmd": cmd["cmd"],
                "code": 0,
                "value": {"echo": cmd["param"]}
            })
        })
        .collect();
    HttpResponse::json(200, &Value::Array(replies))
}
