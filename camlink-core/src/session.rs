// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session Management
//!
//! Tracks the bearer token, its lease and the credentials it was issued for.
//!
//! States: `Unauthenticated → Authenticating → Authenticated →
//! (Expired | LoggedOut) → Unauthenticated`.
//!
//! The credential fingerprint only decides whether a new login must first
//! drop a session issued to a different user. It is not a security boundary.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ring::digest::{digest, SHA256};
use tracing::{debug, info};

use crate::command::Response;

/// Seconds of lease kept in reserve by [`SessionManager::is_authenticated`].
pub const EXPIRY_BUFFER_SECS: f64 = 1.0;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Time since the Unix epoch.
    fn now(&self) -> Duration;
}

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new(start: Duration) -> Self {
        ManualClock {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Hex SHA-256 of a username.
pub fn credential_fingerprint(username: &str) -> String {
    hex::encode(digest(&SHA256, username.as_bytes()).as_ref())
}

/// Authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Expired,
    LoggedOut,
}

/// An issued bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    issued_at: Duration,
    lease_seconds: u64,
    credential_fingerprint: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("lease_seconds", &self.lease_seconds)
            .finish()
    }
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> Duration {
        self.issued_at
    }

    pub fn lease_seconds(&self) -> u64 {
        self.lease_seconds
    }

    pub fn credential_fingerprint(&self) -> &str {
        &self.credential_fingerprint
    }
}

/// Owner of the single session of a connection.
pub struct SessionManager {
    clock: Arc<dyn Clock>,
    session: Option<Session>,
    fingerprint: Option<String>,
    stale_token: Option<String>,
    phase: SessionState,
}

impl SessionManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        SessionManager {
            clock,
            session: None,
            fingerprint: None,
            stale_token: None,
            phase: SessionState::Unauthenticated,
        }
    }

    /// Prepares a login for `username`.
    ///
    /// A different username than last time drops the current session first;
    /// its token is kept aside for [`take_stale_token`](Self::take_stale_token)
    /// so the caller can log it out on the device. Returns false, without
    /// touching any state, if the transport is not connected.
    pub fn prelogin(&mut self, username: &str, connected: bool) -> bool {
        if !connected {
            debug!("prelogin skipped, transport not connected");
            return false;
        }

        let fingerprint = credential_fingerprint(username);
        if self.fingerprint.as_deref() != Some(fingerprint.as_str()) {
            if let Some(session) = self.session.take() {
                info!("credentials changed, dropping previous session");
                self.stale_token = Some(session.token);
            }
            self.fingerprint = Some(fingerprint);
        }

        self.phase = SessionState::Authenticating;
        true
    }

    /// Takes the token of a session dropped by a credential change.
    pub fn take_stale_token(&mut self) -> Option<String> {
        self.stale_token.take()
    }

    /// Records a login response. Returns false if it carries no token.
    pub fn process_login(&mut self, response: &Response) -> bool {
        let Some(token) = response.login_token() else {
            self.phase = SessionState::Unauthenticated;
            return false;
        };

        self.session = Some(Session {
            token: token.name,
            issued_at: self.clock.now(),
            lease_seconds: token.lease_time,
            credential_fingerprint: self.fingerprint.clone().unwrap_or_default(),
        });
        self.phase = SessionState::Authenticated;
        info!(lease_seconds = token.lease_time, "session established");
        true
    }

    /// Seconds until the lease runs out. Negative once expired, zero without a session.
    pub fn authentication_timeout(&self) -> f64 {
        match &self.session {
            Some(session) => {
                let expires_at = session.issued_at.as_secs_f64() + session.lease_seconds as f64;
                expires_at - self.clock.now().as_secs_f64()
            }
            None => 0.0,
        }
    }

    /// True if a token is held and more than one second of lease remains.
    pub fn is_authenticated(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.token.is_empty())
            && self.authentication_timeout() > EXPIRY_BUFFER_SECS
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            SessionState::Authenticated if !self.is_authenticated() => SessionState::Expired,
            phase => phase,
        }
    }

    /// Current token, while one is held (even if close to expiry).
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Fingerprint of the credentials last passed to `prelogin`.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Drops the token after an explicit logout.
    pub fn logged_out(&mut self) {
        self.session = None;
        self.phase = SessionState::LoggedOut;
    }

    /// Drops the token and returns to `Unauthenticated`.
    pub fn clear(&mut self) {
        if self.session.take().is_some() {
            debug!("session cleared");
        }
        self.phase = SessionState::Unauthenticated;
    }
}
