// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Redirect Workflow Integration Tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use camlink_core::api::ApiError;
use camlink_core::command::Request;
use camlink_core::network::{
    DisconnectObserver, ForceGetPredicate, HttpResponse, NetworkError, RouteContext,
    RouteDecision,
};
use serde_json::json;

use crate::common::{
    challenge_reply, encrypted_config, encrypted_login_reply, login_reply, mock_dispatcher,
    plain_config, request_body,
};

/// Forces `GetTime` onto GET so its query is encrypted.
struct GetTimeOverGet;

impl ForceGetPredicate for GetTimeOverGet {
    fn route(&self, requests: &[Request], _context: &RouteContext) -> RouteDecision {
        RouteDecision {
            force_get: requests.iter().any(|r| r.command() == "GetTime"),
            query: None,
        }
    }
}

#[derive(Default)]
struct DisconnectCounter(AtomicUsize);

impl DisconnectCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl DisconnectObserver for DisconnectCounter {
    fn on_disconnect(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_scheme_flip_redispatches_batch_once() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_json(login_reply("tok", 3600));
    client.login().await.unwrap();

    mock.queue_redirect(302, "https://192.168.1.10/cgi-bin/api.cgi");
    mock.queue_json(json!([
        {"cmd": "GetTime", "code": 0, "value": {}},
        {"cmd": "GetDevInfo", "code": 0, "value": {}}
    ]));

    let responses = client
        .dispatch_collect(vec![Request::new("GetTime"), Request::new("GetDevInfo")])
        .await
        .unwrap();
    assert_eq!(responses.len(), 2);

    let opened = mock.opened_urls();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].scheme(), "http");
    assert_eq!(opened[1].scheme(), "https");

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].body, requests[2].body);
    assert_eq!(requests[2].url.scheme(), "https");

    // The reconnect is a disconnect: the old token is gone
    assert!(!client.is_authenticated());
    assert_eq!(client.transport().disconnect_generation(), 1);
}

#[tokio::test]
async fn test_redirect_cap_from_config() {
    let config = plain_config().with_max_redirects(1);
    let (mut client, mock, _clock) = mock_dispatcher(config);
    mock.queue_redirect(301, "/cgi-bin/api.cgi");
    mock.queue_redirect(301, "/cgi-bin/api.cgi");

    let result = client.dispatch(vec![Request::new("GetTime")]).await;
    assert!(matches!(
        result,
        Err(ApiError::Network(NetworkError::TooManyRedirects(1)))
    ));
}

#[tokio::test]
async fn test_redirect_without_location() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    mock.queue_response(HttpResponse::new(302, ""));

    let result = client.dispatch(vec![Request::new("GetTime")]).await;
    assert!(matches!(
        result,
        Err(ApiError::Network(NetworkError::RedirectWithoutLocation))
    ));
}

#[tokio::test]
async fn test_redirected_probe_completes_digest_login() {
    let (mut client, mock, _clock) = mock_dispatcher(encrypted_config());
    mock.queue_redirect(302, "https://192.168.1.10/cgi-bin/api.cgi?cmd=Login");
    mock.queue_response(challenge_reply());
    mock.queue_json(encrypted_login_reply("enc", 100, 3));
    mock.queue_json(login_reply("plain", 3600));

    client.login().await.unwrap();

    assert!(client.handshake().is_established());
    assert_eq!(client.sessions().token(), Some("enc"));
    assert_eq!(mock.pending_replies(), 1);

    // Challenge and digest login both ran on the new connection
    let bases = mock.request_bases();
    assert_eq!(bases.len(), 3);
    assert_eq!(bases[0].scheme(), "http");
    assert_eq!(bases[1].scheme(), "https");
    assert_eq!(bases[2].scheme(), "https");

    // The password never went out in plain text
    for request in mock.requests() {
        let body = request_body(&request);
        assert!(body.iter().all(|cmd| cmd["param"]["User"]["password"].is_null()));
    }
    assert!(request_body(&mock.requests()[2])[0]["param"]["Digest"].is_object());
}

#[tokio::test]
async fn test_redirected_digest_login_keeps_challenge() {
    let (mut client, mock, _clock) = mock_dispatcher(encrypted_config());
    mock.queue_response(challenge_reply());
    mock.queue_redirect(302, "https://192.168.1.10/cgi-bin/api.cgi?cmd=Login");
    mock.queue_json(encrypted_login_reply("enc", 100, 3));

    client.login().await.unwrap();

    assert!(client.handshake().is_established());
    assert_eq!(client.sessions().token(), Some("enc"));
    assert_eq!(mock.requests().len(), 3);
}

#[tokio::test]
async fn test_redirected_encrypted_get_is_decrypted() {
    let (mut client, mock, _clock) = mock_dispatcher(encrypted_config());
    client.add_predicate(Arc::new(GetTimeOverGet));
    mock.queue_response(challenge_reply());
    mock.queue_json(encrypted_login_reply("enc", 100, 3));
    client.login().await.unwrap();

    let plain_reply = json!([{"cmd": "GetTime", "code": 0, "value": {"Time": {"year": 2026}}}]);
    let ciphertext = client
        .handshake()
        .cipher_session()
        .unwrap()
        .encrypt(&plain_reply.to_string())
        .unwrap();
    mock.queue_redirect(302, "https://192.168.1.10/cgi-bin/api.cgi");
    mock.queue_response(
        HttpResponse::new(200, ciphertext).with_header("Content-Type", "text/html"),
    );

    let responses = client
        .dispatch_collect(vec![Request::new("GetTime")])
        .await
        .unwrap();
    assert_eq!(responses[0].value().unwrap()["Time"]["year"], 2026);

    // The reply was read with the old cipher; the reconnect then drops it
    assert!(!client.handshake().is_established());
    assert!(client.handshake().can_attempt());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_disconnect_observer_sees_disconnect_and_reconnect() {
    let (mut client, mock, _clock) = mock_dispatcher(plain_config());
    let observer = Arc::new(DisconnectCounter::default());
    client.add_disconnect_observer(observer.clone());

    mock.queue_redirect(302, "https://192.168.1.10/cgi-bin/api.cgi");
    mock.queue_json(json!([{"cmd": "GetTime", "code": 0, "value": {}}]));
    client
        .dispatch_collect(vec![Request::new("GetTime")])
        .await
        .unwrap();
    assert_eq!(observer.count(), 1);

    client.disconnect();
    assert_eq!(observer.count(), 2);
    assert!(!client.is_connected());
}
