// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Login Workflow Integration Tests
//!
//! Plain login, lease expiry, credential changes and logout.

use std::time::Duration;

use camlink_core::api::{ApiError, ErrorCategory};
use camlink_core::command::ErrorCode;
use camlink_core::network::HttpResponse;
use camlink_core::SessionState;
use serde_json::json;

use crate::common::{error_reply, login_reply, mock_dispatcher, plain_config, request_body};

#[tokio::test]
async fn test_plain_login() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));

    client.login().await.unwrap();
    assert!(client.is_connected());
    assert!(client.is_authenticated());
    assert_eq!(client.session_state(), SessionState::Authenticated);
    assert_eq!(client.sessions().token(), Some("tok"));

    let request = mock.last_request().unwrap();
    assert_eq!(request.url.query(), Some("cmd=Login"));
    assert_eq!(request.query_param("token"), None);

    let body = request_body(&request);
    assert_eq!(body[0]["cmd"], "Login");
    assert_eq!(body[0]["param"]["User"]["userName"], "admin");
    assert_eq!(body[0]["param"]["User"]["password"], "secret");
}

#[tokio::test]
async fn test_rejected_login() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(error_reply("Login", -502, "password wrong"));

    let err = client.login().await.unwrap_err();
    match &err {
        ApiError::LoginFailed(error) => assert_eq!(error.code(), ErrorCode::PasswordWrong),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Authentication);
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_login_reply_without_token() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(json!([{"cmd": "Login", "code": 0, "value": {}}]));

    assert!(matches!(client.login().await, Err(ApiError::MissingToken)));
}

#[tokio::test]
async fn test_lease_expiry_triggers_relogin() {
    let (mut client, mock, clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("first", 60));
    client.ensure_authenticated().await.unwrap();

    let timeout = client.authentication_timeout();
    assert!(timeout > 59.9 && timeout <= 60.0);

    // Still valid: no network traffic
    client.ensure_authenticated().await.unwrap();
    assert_eq!(mock.requests().len(), 1);

    clock.advance(Duration::from_secs(61));
    assert!(!client.is_authenticated());
    assert_eq!(client.session_state(), SessionState::Expired);

    mock.queue_json(login_reply("second", 60));
    client.ensure_authenticated().await.unwrap();
    assert_eq!(mock.requests().len(), 2);
    assert_eq!(client.sessions().token(), Some("second"));
}

#[tokio::test]
async fn test_credential_change_logs_out_old_token() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("admin-token", 3600));
    client.login().await.unwrap();

    client.set_credentials("guest", "guest-pw");
    mock.queue_json(json!([{"cmd": "Logout", "code": 0, "value": {"rspCode": 200}}]));
    mock.queue_json(login_reply("guest-token", 3600));
    client.login().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].query_param("cmd").as_deref(), Some("Logout"));
    assert_eq!(
        requests[1].query_param("token").as_deref(),
        Some("admin-token")
    );
    assert_eq!(
        request_body(&requests[2])[0]["param"]["User"]["userName"],
        "guest"
    );
    assert_eq!(client.sessions().token(), Some("guest-token"));
}

#[tokio::test]
async fn test_logout() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));
    client.login().await.unwrap();

    mock.queue_json(json!([{"cmd": "Logout", "code": 0, "value": {"rspCode": 200}}]));
    client.logout().await;

    let request = mock.last_request().unwrap();
    assert_eq!(request.query_param("cmd").as_deref(), Some("Logout"));
    assert_eq!(request.query_param("token").as_deref(), Some("tok"));
    assert_eq!(client.session_state(), SessionState::LoggedOut);
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_logout_failure_is_swallowed() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));
    client.login().await.unwrap();

    mock.queue_response(HttpResponse::new(502, "Bad Gateway"));
    client.logout().await;
    assert_eq!(client.session_state(), SessionState::LoggedOut);
}

#[tokio::test]
async fn test_logout_without_session_sends_nothing() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    client.logout().await;
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_disconnect_drops_token() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));
    client.login().await.unwrap();

    client.disconnect();
    assert!(!client.is_connected());
    assert_eq!(client.sessions().token(), None);
    assert_eq!(mock.close_count(), 1);
}
