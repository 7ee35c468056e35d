// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Batch Workflow Integration Tests
//!
//! One HTTP call per batch, positional response matching and error handlers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use camlink_core::api::{ApiError, CallbackErrorHandler, ErrorCategory};
use camlink_core::codec::CodecError;
use camlink_core::command::{ErrorCode, Request, Response};
use camlink_core::network::{HttpMethod, HttpResponse};
use futures::StreamExt;
use proptest::prelude::*;
use serde_json::json;

use crate::common::strategies::batch_strategy;
use crate::common::{echo_handler, login_reply, mock_dispatcher, plain_config, request_body};

#[tokio::test]
async fn test_get_time_and_channel_status() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));
    client.login().await.unwrap();

    mock.queue_json(json!([
        {"cmd": "GetTime", "code": 0, "value": {"Time": {"year": 2026, "mon": 10}}},
        {
            "cmd": "GetChannelstatus",
            "code": 0,
            "value": {"count": 1, "status": [{"channel": 0, "online": 1}]}
        }
    ]));

    let responses = client
        .dispatch_collect(vec![Request::new("GetTime"), Request::new("GetChannelstatus")])
        .await
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].command(), "GetTime");
    assert_eq!(responses[1].command(), "GetChannelstatus");
    assert!(responses.iter().all(|r| r.code() == 0));
    assert_eq!(responses[0].value().unwrap()["Time"]["year"], 2026);

    let request = mock.last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url.path(), "/cgi-bin/api.cgi");
    assert_eq!(request.query_param("cmd").as_deref(), Some("GetTime"));
    assert_eq!(request.query_param("token").as_deref(), Some("tok"));
    assert_eq!(request_body(&request).len(), 2);
}

#[tokio::test]
async fn test_bare_object_reply_for_single_request() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(json!({"cmd": "GetDevInfo", "code": 0, "value": {"DevInfo": {"model": "X"}}}));

    let responses = client
        .dispatch_collect(vec![Request::new("GetDevInfo")])
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].value().unwrap()["DevInfo"]["model"], "X");

    // Still framed as an array on the way out
    let body = request_body(&mock.last_request().unwrap());
    assert_eq!(body, vec![json!({"cmd": "GetDevInfo", "action": 0, "param": {}})]);
}

#[tokio::test]
async fn test_command_errors_are_data() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(json!([
        {"cmd": "GetTime", "code": 0, "value": {}},
        {"cmd": "GetWifi", "code": 1, "error": {"rspCode": -6, "detail": "please login first"}}
    ]));

    let responses = client
        .dispatch_collect(vec![Request::new("GetTime"), Request::new("GetWifi")])
        .await
        .unwrap();

    assert!(!responses[0].is_error());
    let error = responses[1].error().unwrap();
    assert_eq!(error.code(), ErrorCode::AuthRequired);
    assert!(error.is_auth_failure());
}

#[tokio::test]
async fn test_error_handler_suppresses_response() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    client.add_error_handler(Arc::new(CallbackErrorHandler::new(
        move |response: &Response| {
            counter.fetch_add(1, Ordering::SeqCst);
            response
                .error()
                .is_some_and(|e| e.code() == ErrorCode::NotSupported)
        },
    )));

    mock.queue_json(json!([
        {"cmd": "GetTime", "code": 0, "value": {}},
        {"cmd": "GetPtzPreset", "code": 1, "error": {"rspCode": -9, "detail": "not support"}},
        {"cmd": "GetWifi", "code": 1, "error": {"rspCode": -6, "detail": "please login first"}}
    ]));

    let responses = client
        .dispatch_collect(vec![
            Request::new("GetTime"),
            Request::new("GetPtzPreset"),
            Request::new("GetWifi"),
        ])
        .await
        .unwrap();

    let commands: Vec<&str> = responses.iter().map(Response::command).collect();
    assert_eq!(commands, vec!["GetTime", "GetWifi"]);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_response_count_mismatch_is_malformed() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(json!([{"cmd": "GetTime", "code": 0, "value": {}}]));

    let result = client
        .dispatch(vec![Request::new("GetTime"), Request::new("GetOsd")])
        .await;
    assert!(matches!(
        result,
        Err(ApiError::Codec(CodecError::Malformed(_)))
    ));
}

#[tokio::test]
async fn test_http_error_status_raises() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_response(HttpResponse::new(500, "Internal Server Error"));

    let err = client
        .dispatch(vec![Request::new("GetTime")])
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), ErrorCategory::HttpStatus);
    assert_eq!(err.http_status(), Some(500));
}

#[tokio::test]
async fn test_non_json_body_raises() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_response(
        HttpResponse::new(200, "<html>login</html>").with_header("Content-Type", "text/html"),
    );

    let err = client
        .dispatch(vec![Request::new("GetTime")])
        .await
        .err()
        .unwrap();
    assert_eq!(err.category(), ErrorCategory::Protocol);
}

#[tokio::test]
async fn test_responses_as_stream() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_handler(echo_handler);

    let stream = client
        .dispatch(vec![
            Request::new("GetOsd").with_param("channel", 0),
            Request::new("GetOsd").with_param("channel", 1),
        ])
        .await
        .unwrap()
        .into_responses()
        .unwrap()
        .into_stream();

    let responses: Vec<Response> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(responses[0].value().unwrap()["echo"]["channel"], 0);
    assert_eq!(responses[1].value().unwrap()["echo"]["channel"], 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_dispatch_preserves_order_with_duplicates(requests in batch_strategy()) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (mut client, mock, _clock) = mock_dispatcher(plain_config());
        mock.queue_handler(echo_handler);

        let responses = runtime
            .block_on(client.dispatch_collect(requests.clone()))
            .unwrap();

        prop_assert_eq!(responses.len(), requests.len());
        prop_assert_eq!(mock.requests().len(), 1);
        for (request, response) in requests.iter().zip(&responses) {
            prop_assert_eq!(response.request_id(), request.id());
            prop_assert_eq!(response.command(), request.command());
            let echoed = &response.value().unwrap()["echo"];
            prop_assert_eq!(echoed, &serde_json::Value::Object(request.parameters().clone()));
        }
    }
}
