// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock HTTP backend for testing
//!
//! Replies are scripted in order and shared by every session the connector
//! opens, so a test can follow a redirect across a reconnect.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::error::NetworkError;
use super::transport::{HttpConnector, HttpRequest, HttpResponse, HttpSession, TransportResult};

type ReplyFn = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send>;

enum MockReply {
    Response(HttpResponse),
    Error(NetworkError),
    Handler(ReplyFn),
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    opened: Vec<Url>,
    requests: Vec<(Url, HttpRequest)>,
    closed: usize,
    fail_open: Option<NetworkError>,
}

/// Scriptable connector recording every open, request and close.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a response.
    pub fn queue_response(&self, response: HttpResponse) {
        self.lock().replies.push_back(MockReply::Response(response));
    }

    /// Queues a `200 application/json` response.
    pub fn queue_json(&self, body: serde_json::Value) {
        self.queue_response(HttpResponse::json(200, &body));
    }

    /// Queues a redirect.
    pub fn queue_redirect(&self, status: u16, location: &str) {
        self.queue_response(HttpResponse::redirect(status, location));
    }

    /// Queues a transport error.
    pub fn queue_error(&self, error: NetworkError) {
        self.lock().replies.push_back(MockReply::Error(error));
    }

    /// Queues a reply computed from the request (e.g. an echo server).
    pub fn queue_handler<F>(&self, handler: F)
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + 'static,
    {
        self.lock()
            .replies
            .push_back(MockReply::Handler(Box::new(handler)));
    }

    /// Makes the next `open` fail.
    pub fn fail_next_open(&self, error: NetworkError) {
        self.lock().fail_open = Some(error);
    }

    /// Base URLs of all sessions opened so far.
    pub fn opened_urls(&self) -> Vec<Url> {
        self.lock().opened.clone()
    }

    /// Number of sessions opened so far.
    pub fn open_count(&self) -> usize {
        self.lock().opened.len()
    }

    /// Number of sessions closed so far.
    pub fn close_count(&self) -> usize {
        self.lock().closed
    }

    /// All requests executed so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Base URL of the session each request was executed on.
    pub fn request_bases(&self) -> Vec<Url> {
        self.lock().requests.iter().map(|(b, _)| b.clone()).collect()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.lock().requests.last().map(|(_, r)| r.clone())
    }

    /// Number of scripted replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }
}

impl HttpConnector for MockConnector {
    type Session = MockSession;

    fn open(&self, base_url: &Url, _timeout: Duration) -> TransportResult<MockSession> {
        let mut state = self.lock();
        if let Some(error) = state.fail_open.take() {
            return Err(error);
        }
        state.opened.push(base_url.clone());
        Ok(MockSession {
            base_url: base_url.clone(),
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

/// Session handed out by [`MockConnector`].
pub struct MockSession {
    base_url: Url,
    state: Arc<Mutex<MockState>>,
    open: bool,
}

#[async_trait]
impl HttpSession for MockSession {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        if !self.open {
            return Err(NetworkError::NotConnected);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.requests.push((self.base_url.clone(), request.clone()));

        match state.replies.pop_front() {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error(error)) => Err(error),
            Some(MockReply::Handler(handler)) => Ok(handler(&request)),
            None => Err(NetworkError::ConnectionFailed(
                "no scripted reply".to_string(),
            )),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.closed += 1;
        }
    }
}
