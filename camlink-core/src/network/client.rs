// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Client
//!
//! Owns the single HTTP session of a device connection.
//!
//! Wraps an [`HttpConnector`] and adds:
//! - Idempotent connect keyed by [`ConnectionIdentity`]
//! - One teardown point (`disconnect`) with observers
//! - Redirect following across scheme changes, bounded by a hop limit
//! - HTTP status classification

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::error::NetworkError;
use super::routing::{resolve_route, ForceGetPredicate, ResolvedRoute, RouteContext};
use super::transport::{
    ConnectionIdentity, HttpConnector, HttpMethod, HttpRequest, HttpResponse, HttpSession,
    TransportResult, API_PATH,
};
use crate::command::Request;

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Notified whenever the transport tears its session down.
pub trait DisconnectObserver: Send + Sync {
    fn on_disconnect(&self);
}

/// One routed call ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingCall {
    pub method: HttpMethod,
    /// Query string without the leading `?`.
    pub query: String,
    /// JSON body for POST.
    pub body: Option<Vec<u8>>,
}

impl OutgoingCall {
    /// Builds a call from a resolved route; GET calls carry no body.
    pub fn from_route(route: ResolvedRoute, body: Vec<u8>) -> Self {
        let body = match route.method {
            HttpMethod::Get => None,
            HttpMethod::Post => Some(body),
        };
        OutgoingCall {
            method: route.method,
            query: route.query,
            body,
        }
    }
}

/// Connection owner for one device.
pub struct TransportClient<C: HttpConnector> {
    connector: C,
    session: Option<C::Session>,
    identity: Option<ConnectionIdentity>,
    base_url: Option<Url>,
    timeout: Duration,
    max_redirects: u32,
    predicates: Vec<Arc<dyn ForceGetPredicate>>,
    observers: Vec<Arc<dyn DisconnectObserver>>,
    disconnect_generation: u64,
}

impl<C: HttpConnector> TransportClient<C> {
    /// Creates a disconnected client.
    pub fn new(connector: C) -> Self {
        TransportClient {
            connector,
            session: None,
            identity: None,
            base_url: None,
            timeout: Duration::from_secs(30),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            predicates: Vec::new(),
            observers: Vec::new(),
            disconnect_generation: 0,
        }
    }

    /// Sets the redirect hop limit.
    pub fn set_max_redirects(&mut self, max_redirects: u32) {
        self.max_redirects = max_redirects;
    }

    /// Registers a force-GET predicate. Predicates run in registration order.
    pub fn add_predicate(&mut self, predicate: Arc<dyn ForceGetPredicate>) {
        self.predicates.push(predicate);
    }

    /// Registers a disconnect observer.
    pub fn add_observer(&mut self, observer: Arc<dyn DisconnectObserver>) {
        self.observers.push(observer);
    }

    /// Connects to `host`, reusing the current session if the identity is unchanged.
    pub fn connect(
        &mut self,
        host: &str,
        port: Option<u16>,
        timeout: Duration,
        encryption: Option<bool>,
    ) -> TransportResult<&ConnectionIdentity> {
        let identity = ConnectionIdentity::resolve(host, port, encryption);
        self.connect_identity(identity, timeout)?;
        self.identity.as_ref().ok_or(NetworkError::NotConnected)
    }

    fn connect_identity(
        &mut self,
        identity: ConnectionIdentity,
        timeout: Duration,
    ) -> TransportResult<()> {
        if self.session.is_some() && self.identity.as_ref() == Some(&identity) {
            debug!(host = %identity.host, "already connected");
            return Ok(());
        }
        if self.session.is_some() {
            self.disconnect();
        }

        let base_url = identity.base_url()?;
        let session = self.connector.open(&base_url, timeout)?;
        info!(
            scheme = identity.scheme.as_str(),
            host = %identity.host,
            port = identity.port,
            "connected"
        );

        self.session = Some(session);
        self.base_url = Some(base_url);
        self.identity = Some(identity);
        self.timeout = timeout;
        Ok(())
    }

    /// Closes the session and notifies observers. Safe to call when disconnected.
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            if let Some(identity) = &self.identity {
                info!(host = %identity.host, "disconnected");
            }
        }
        self.identity = None;
        self.base_url = None;
        self.disconnect_generation += 1;

        for observer in &self.observers {
            observer.on_disconnect();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn identity(&self) -> Option<&ConnectionIdentity> {
        self.identity.as_ref()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Incremented on every `disconnect`, including redirect reconnects.
    pub fn disconnect_generation(&self) -> u64 {
        self.disconnect_generation
    }

    /// Routes a batch through the registered predicates.
    pub fn route(&self, requests: &[Request], context: &RouteContext) -> ResolvedRoute {
        resolve_route(&self.predicates, requests, context)
    }

    /// Sends one call, following redirects.
    ///
    /// Returns the first non-redirect response with a status below 300.
    pub async fn send(&mut self, call: &OutgoingCall) -> TransportResult<HttpResponse> {
        let response = self.send_unchecked(call).await?;
        match response.status {
            status if status >= 300 => Err(NetworkError::from_status(status)),
            _ => Ok(response),
        }
    }

    /// Like [`send`](Self::send), but returns 4xx/5xx responses instead of
    /// failing, so their headers can be inspected.
    pub async fn send_unchecked(&mut self, call: &OutgoingCall) -> TransportResult<HttpResponse> {
        let mut hops = 0;
        loop {
            let request = self.build_request(call)?;
            debug!(method = ?request.method, path = request.url.path(), "sending");

            let session = self.session.as_ref().ok_or(NetworkError::NotConnected)?;
            let response = session.execute(request).await?;

            match response.status {
                300..=302 => {
                    hops += 1;
                    if hops > self.max_redirects {
                        return Err(NetworkError::TooManyRedirects(self.max_redirects));
                    }
                    self.follow_redirect(&response)?;
                }
                _ => return Ok(response),
            }
        }
    }

    fn build_request(&self, call: &OutgoingCall) -> TransportResult<HttpRequest> {
        let base = self.base_url.as_ref().ok_or(NetworkError::NotConnected)?;
        let mut url = base
            .join(API_PATH)
            .map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        if !call.query.is_empty() {
            url.set_query(Some(&call.query));
        }

        let mut headers = vec![("Accept".to_string(), "*/*".to_string())];
        if call.body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: call.method,
            url,
            headers,
            body: call.body.clone(),
        })
    }

    fn follow_redirect(&mut self, response: &HttpResponse) -> TransportResult<()> {
        let location = response
            .header("Location")
            .ok_or(NetworkError::RedirectWithoutLocation)?;
        let base = self.base_url.as_ref().ok_or(NetworkError::NotConnected)?;
        let target = base
            .join(location)
            .map_err(|e| NetworkError::InvalidRedirect(format!("{location}: {e}")))?;
        let identity = ConnectionIdentity::from_url(&target)?;

        match &self.identity {
            Some(current) if current.scheme != identity.scheme => warn!(
                from = current.scheme.as_str(),
                to = identity.scheme.as_str(),
                host = %identity.host,
                "redirected to a different scheme, reconnecting"
            ),
            _ => debug!(host = %identity.host, port = identity.port, "following redirect"),
        }

        self.connect_identity(identity, self.timeout)
    }
}
