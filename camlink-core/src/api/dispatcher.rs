// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Batch Dispatcher
//!
//! Façade combining transport, codec, session and handshake.
//!
//! One `dispatch` is one HTTP round trip. Responses are zipped to requests
//! by position, so duplicate commands in a batch resolve correctly.
//!
//! The dispatcher is not internally synchronized: callers must not run two
//! operations on the same instance concurrently.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::form_urlencoded;
use zeroize::Zeroizing;

use super::config::ClientConfig;
use super::error::{ApiError, ApiResult};
use super::handlers::{ErrorHandler, ErrorHandlers};
use super::output::{ByteChunks, Dispatched, ResponseIter};
use crate::codec::{self, CodecError, PayloadKind};
use crate::command::{Request, Response};
use crate::crypto::{generate_cnonce, CounterLease, EncryptedHandshake};
use crate::network::{
    DisconnectObserver, ForceGetPredicate, HttpConnector, HttpMethod, HttpResponse, LoginRoute,
    OutgoingCall, ReqwestConnector, RouteContext, SnapshotRoute, TransportClient, TransportResult,
    API_PATH,
};
use crate::session::{Clock, SessionManager, SessionState, SystemClock};

/// Reply body of one call, before responses are matched to requests.
enum ReplyBody {
    Binary(ByteChunks),
    Json(Vec<serde_json::Value>),
}

/// Batched command client for one device.
pub struct BatchDispatcher<C: HttpConnector> {
    config: ClientConfig,
    transport: TransportClient<C>,
    sessions: SessionManager,
    handshake: EncryptedHandshake,
    handlers: ErrorHandlers,
    seen_generation: u64,
}

impl BatchDispatcher<ReqwestConnector> {
    /// Creates a dispatcher using the reqwest backend.
    pub fn with_reqwest(config: ClientConfig) -> ApiResult<Self> {
        let connector =
            ReqwestConnector::new().with_accept_invalid_certs(config.accept_invalid_certs);
        Self::new(config, connector)
    }
}

impl<C: HttpConnector> BatchDispatcher<C> {
    /// Creates a dispatcher with the system clock.
    pub fn new(config: ClientConfig, connector: C) -> ApiResult<Self> {
        Self::with_clock(config, connector, Arc::new(SystemClock))
    }

    /// Creates a dispatcher with a custom clock.
    pub fn with_clock(
        config: ClientConfig,
        connector: C,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        config.validate().map_err(ApiError::Configuration)?;

        let mut transport = TransportClient::new(connector);
        transport.set_max_redirects(config.max_redirects);
        transport.add_predicate(Arc::new(LoginRoute));
        transport.add_predicate(Arc::new(SnapshotRoute));

        Ok(BatchDispatcher {
            config,
            transport,
            sessions: SessionManager::new(clock),
            handshake: EncryptedHandshake::new(),
            handlers: ErrorHandlers::new(),
            seen_generation: 0,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &TransportClient<C> {
        &self.transport
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn handshake(&self) -> &EncryptedHandshake {
        &self.handshake
    }

    /// Replaces the login credentials. The next [`login`](Self::login) logs
    /// out the token held under the previous username.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.config.username = username.into();
        self.config.password = Zeroizing::new(password.into());
    }

    /// Registers a force-GET predicate after the built-in ones.
    pub fn add_predicate(&mut self, predicate: Arc<dyn ForceGetPredicate>) {
        self.transport.add_predicate(predicate);
    }

    /// Registers an error handler.
    pub fn add_error_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.handlers.add_handler(handler);
    }

    /// Registers a disconnect observer on the transport.
    pub fn add_disconnect_observer(&mut self, observer: Arc<dyn DisconnectObserver>) {
        self.transport.add_observer(observer);
    }

    /// Connects using the configured host, port and scheme. No-op if already connected.
    pub fn connect(&mut self) -> ApiResult<()> {
        self.transport.connect(
            &self.config.host,
            self.config.port,
            self.config.timeout,
            self.config.use_https,
        )?;
        self.sync_teardown();
        Ok(())
    }

    /// Closes the connection and drops session and cipher state.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.sync_teardown();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    /// Seconds left on the token lease (negative once expired).
    pub fn authentication_timeout(&self) -> f64 {
        self.sessions.authentication_timeout()
    }

    /// Clears session and cipher state if the transport disconnected since the last check.
    fn sync_teardown(&mut self) {
        if self.take_reconnect() {
            self.handshake.reset();
        }
    }

    /// Records a disconnect seen since the last check and drops the token.
    ///
    /// The handshake is left to the caller: a call that was redirected still
    /// needs its cipher or pending challenge to finish on the new connection.
    fn take_reconnect(&mut self) -> bool {
        let generation = self.transport.disconnect_generation();
        if generation == self.seen_generation {
            return false;
        }
        self.seen_generation = generation;
        self.sessions.clear();
        true
    }

    /// Drops handshake state left over from before a mid-call reconnect.
    ///
    /// A pending challenge was issued on the new connection and survives.
    fn finish_reconnect(&mut self) {
        if !self.handshake.is_challenged() {
            self.handshake.reset();
        }
    }

    fn ensure_connected(&mut self) -> ApiResult<()> {
        if !self.transport.is_connected() {
            self.connect()?;
        }
        Ok(())
    }

    /// Sends a batch in one HTTP call.
    ///
    /// Yields one response per request in request order, or a byte-chunk
    /// sequence for binary content types. Login responses update the session
    /// before this returns.
    pub async fn dispatch(&mut self, requests: Vec<Request>) -> ApiResult<Dispatched> {
        if requests.is_empty() {
            return Ok(Dispatched::Responses(ResponseIter::empty()));
        }
        self.ensure_connected()?;
        self.sync_teardown();

        let context = RouteContext {
            token: self.sessions.token().map(str::to_string),
        };
        let route = self.transport.route(&requests, &context);
        let mut call = OutgoingCall::from_route(route, codec::encode(&requests));

        let lease = self.encrypt_call(&mut call)?;
        let encrypted = self.call_is_encrypted(&call);
        let result = self.transport.send(&call).await;
        if let (Some(lease), Some(cipher)) = (lease, self.handshake.cipher_session_mut()) {
            cipher.release(lease);
        }
        let reconnected = self.take_reconnect();
        let body = self.read_body(result, encrypted);
        if reconnected {
            self.finish_reconnect();
        }

        let values = match body? {
            ReplyBody::Binary(chunks) => return Ok(Dispatched::Binary(chunks)),
            ReplyBody::Json(values) => values,
        };
        if values.len() != requests.len() {
            return Err(CodecError::Malformed(format!(
                "expected {} responses, got {}",
                requests.len(),
                values.len()
            ))
            .into());
        }

        for (request, value) in requests.iter().zip(&values) {
            if request.is_login() {
                let envelope = codec::envelope_from_value(value.clone())?;
                self.sessions
                    .process_login(&Response::from_envelope(request, envelope));
            }
        }

        Ok(Dispatched::Responses(ResponseIter::new(
            requests,
            values,
            self.handlers.clone(),
        )))
    }

    /// Splits binary bodies off and decodes the rest, decrypting if the call was encrypted.
    fn read_body(
        &self,
        result: TransportResult<HttpResponse>,
        encrypted: bool,
    ) -> ApiResult<ReplyBody> {
        let response = result?;
        let content_type = response.content_type().map(str::to_string);
        if PayloadKind::from_content_type(content_type.as_deref()) == PayloadKind::Binary {
            debug!(bytes = response.body.len(), "binary response");
            return Ok(ReplyBody::Binary(ByteChunks::new(
                response.body,
                self.config.binary_chunk_size,
                content_type,
            )));
        }

        let body = if encrypted {
            self.decrypt_body(response.body)?
        } else {
            response.body
        };
        let values = codec::decode_values_with_content_type(&body, content_type.as_deref())?;
        Ok(ReplyBody::Json(values))
    }

    /// Dispatches a batch and collects the responses.
    pub async fn dispatch_collect(&mut self, requests: Vec<Request>) -> ApiResult<Vec<Response>> {
        self.dispatch(requests).await?.into_responses()?.collect_responses()
    }

    /// Wraps the query of a GET call once the cipher session is established.
    fn encrypt_call(&mut self, call: &mut OutgoingCall) -> ApiResult<Option<CounterLease>> {
        if call.method != HttpMethod::Get {
            return Ok(None);
        }
        let Some(cipher) = self.handshake.cipher_session_mut() else {
            return Ok(None);
        };

        let (ciphertext, lease) = cipher.encrypt_query(&call.query, None)?;
        call.query = form_urlencoded::Serializer::new(String::new())
            .append_pair("encrypt", &ciphertext)
            .finish();
        Ok(lease)
    }

    fn call_is_encrypted(&self, call: &OutgoingCall) -> bool {
        call.method == HttpMethod::Get
            && self.handshake.is_established()
            && call.query.starts_with("encrypt=")
    }

    /// Decrypts a text body that is not plain JSON.
    fn decrypt_body(&self, body: Vec<u8>) -> ApiResult<Vec<u8>> {
        let first = body.iter().find(|b| !b.is_ascii_whitespace());
        if matches!(first, Some(b'[') | Some(b'{') | None) {
            return Ok(body);
        }
        let Some(cipher) = self.handshake.cipher_session() else {
            return Ok(body);
        };
        let text = String::from_utf8(body).map_err(|_| crate::crypto::CryptoError::InvalidUtf8)?;
        Ok(cipher.decrypt(&text)?.into_bytes())
    }

    /// Logs in with the configured credentials.
    ///
    /// Tries the encrypted handshake first (unless disabled or known to be
    /// unsupported) and falls back to plain login.
    pub async fn login(&mut self) -> ApiResult<()> {
        self.ensure_connected()?;
        self.sync_teardown();

        let username = self.config.username.clone();
        if !self
            .sessions
            .prelogin(&username, self.transport.is_connected())
        {
            return Err(ApiError::NotConnected);
        }
        if let Some(stale) = self.sessions.take_stale_token() {
            self.handshake.end_session();
            self.send_logout(&stale).await;
        }

        if self.config.encrypt {
            self.handshake.end_session();
            if self.handshake.can_attempt() && self.encrypted_login().await? {
                return Ok(());
            }
        }

        let password = self.config.password.clone();
        let responses = self
            .dispatch_collect(vec![Request::login(&username, &password)])
            .await?;

        if self.sessions.is_authenticated() {
            info!(user = %username, "logged in");
            return Ok(());
        }
        match responses.into_iter().find_map(|r| r.error().cloned()) {
            Some(error) => Err(ApiError::LoginFailed(error)),
            None => Err(ApiError::MissingToken),
        }
    }

    /// Runs probe, challenge and digest login. Returns false to fall back to plain login.
    async fn encrypted_login(&mut self) -> ApiResult<bool> {
        let probe = self.handshake.begin_probe();
        let route = self
            .transport
            .route(std::slice::from_ref(&probe), &RouteContext::default());
        let call = OutgoingCall::from_route(route, codec::encode(std::slice::from_ref(&probe)));
        let method = match call.method {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        };
        let uri = format!("{}?{}", API_PATH, call.query);

        let response = self.transport.send_unchecked(&call).await?;
        // A redirected probe was answered on the new connection; its challenge is current.
        self.take_reconnect();
        let cnonce = generate_cnonce()?;
        if !self.handshake.on_challenge(
            response.header("WWW-Authenticate"),
            method,
            &uri,
            cnonce,
        ) {
            return Ok(false);
        }

        let password = self.config.password.clone();
        let request = self
            .handshake
            .digest_login_request(&self.config.username, &password)?;

        let responses = match self.dispatch_collect(vec![request]).await {
            Ok(responses) => responses,
            Err(ApiError::Network(err)) if err.status().is_none() => {
                self.handshake.reset();
                return Err(err.into());
            }
            Err(err) => {
                self.handshake.mark_unsupported(&err.to_string());
                return Ok(false);
            }
        };

        let Some(response) = responses.first() else {
            self.handshake.mark_unsupported("empty digest login reply");
            return Ok(false);
        };
        if !self.handshake.on_login_response(&password, response) {
            self.sessions.clear();
            return Ok(false);
        }
        info!(user = %self.config.username, "logged in with encrypted session");
        Ok(true)
    }

    /// Logs in only if the current token is missing or about to expire.
    pub async fn ensure_authenticated(&mut self) -> ApiResult<()> {
        if self.sessions.is_authenticated() {
            return Ok(());
        }
        self.login().await
    }

    /// Logs out on the device (best effort) and drops session and cipher state.
    pub async fn logout(&mut self) {
        if let Some(token) = self.sessions.token().map(str::to_string) {
            if self.transport.is_connected() {
                self.send_logout(&token).await;
            }
        }
        self.sessions.logged_out();
        self.handshake.end_session();
    }

    async fn send_logout(&mut self, token: &str) {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("cmd", crate::command::LOGOUT_COMMAND)
            .append_pair("token", token)
            .finish();
        let call = OutgoingCall {
            method: HttpMethod::Post,
            query,
            body: Some(codec::encode(&[Request::logout()])),
        };
        match self.transport.send(&call).await {
            Ok(_) => debug!("logged out"),
            Err(err) => warn!(error = %err, "logout failed"),
        }
    }
}
