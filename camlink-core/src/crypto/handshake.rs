// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Encrypted Login Handshake
//!
//! State machine for the optional digest handshake around `Login`:
//!
//! ```text
//! Disabled -> Probing -> Challenged -> Established
//!     \          \            \
//!      +----------+------------+--> Unsupported (until reset)
//! ```
//!
//! `Unsupported` is sticky: once a probe or digest login fails, the client
//! logs in with plain text until the connection is torn down.

use tracing::{debug, info, warn};

use super::cipher::{CipherSession, CryptoError};
use super::digest::DigestChallenge;
use crate::command::{Request, Response};

/// Handshake progress for one connection.
#[derive(Debug)]
pub enum HandshakeState {
    /// Not attempted yet.
    Disabled,
    /// Probe sent, waiting for a challenge.
    Probing,
    /// Challenge received, digest login pending.
    Challenged(DigestChallenge),
    /// Key negotiated; GET payloads are encrypted.
    Established(CipherSession),
    /// Device cannot encrypt (or the attempt failed); do not retry.
    Unsupported,
}

/// Drives the digest handshake and owns the resulting cipher session.
#[derive(Debug)]
pub struct EncryptedHandshake {
    state: HandshakeState,
}

impl Default for EncryptedHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptedHandshake {
    pub fn new() -> Self {
        EncryptedHandshake {
            state: HandshakeState::Disabled,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    /// True if a handshake may be started.
    pub fn can_attempt(&self) -> bool {
        matches!(self.state, HandshakeState::Disabled)
    }

    pub fn is_established(&self) -> bool {
        matches!(self.state, HandshakeState::Established(_))
    }

    /// True while a digest login for a received challenge is pending.
    pub fn is_challenged(&self) -> bool {
        matches!(self.state, HandshakeState::Challenged(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.state, HandshakeState::Unsupported)
    }

    /// Moves to `Probing` and returns the version-only probe.
    pub fn begin_probe(&mut self) -> Request {
        self.state = HandshakeState::Probing;
        Request::login_probe()
    }

    /// Handles the probe reply's `WWW-Authenticate` header.
    ///
    /// A missing or unparsable challenge downgrades to `Unsupported`; that
    /// is a capability signal, not an error.
    pub fn on_challenge(
        &mut self,
        header: Option<&str>,
        method: &str,
        uri: &str,
        cnonce: String,
    ) -> bool {
        if !matches!(self.state, HandshakeState::Probing) {
            self.mark_unsupported("challenge received outside of probe");
            return false;
        }
        let Some(header) = header else {
            self.mark_unsupported("no digest challenge");
            return false;
        };

        match DigestChallenge::parse(header, method, uri, cnonce) {
            Ok(challenge) => {
                debug!(realm = %challenge.realm, qop = %challenge.qop, "digest challenge received");
                self.state = HandshakeState::Challenged(challenge);
                true
            }
            Err(err) => {
                self.mark_unsupported(&err.to_string());
                false
            }
        }
    }

    /// Builds the digest login for the pending challenge.
    pub fn digest_login_request(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Request, CryptoError> {
        match &self.state {
            HandshakeState::Challenged(challenge) => {
                Ok(challenge.login_request(username, password))
            }
            _ => Err(CryptoError::InvalidChallenge(
                "no pending challenge".to_string(),
            )),
        }
    }

    /// Handles the digest login reply; establishes the cipher on success.
    pub fn on_login_response(&mut self, password: &str, response: &Response) -> bool {
        let HandshakeState::Challenged(challenge) = &self.state else {
            self.mark_unsupported("login response without challenge");
            return false;
        };
        let Some(token) = response.login_token() else {
            self.mark_unsupported("digest login rejected");
            return false;
        };

        let key = challenge.session_key(password);
        let cipher = match (token.check_basic, token.count_total) {
            (Some(check_basic), Some(count_total)) => {
                CipherSession::with_counters(key, check_basic, count_total)
            }
            _ => CipherSession::new(key),
        };
        info!(counters = cipher.slots().len(), "encrypted session established");
        self.state = HandshakeState::Established(cipher);
        true
    }

    /// Gives up on encryption until the next reset.
    pub fn mark_unsupported(&mut self, reason: &str) {
        warn!(reason, "encryption unavailable, using plain login");
        self.state = HandshakeState::Unsupported;
    }

    pub fn cipher_session(&self) -> Option<&CipherSession> {
        match &self.state {
            HandshakeState::Established(cipher) => Some(cipher),
            _ => None,
        }
    }

    pub fn cipher_session_mut(&mut self) -> Option<&mut CipherSession> {
        match &mut self.state {
            HandshakeState::Established(cipher) => Some(cipher),
            _ => None,
        }
    }

    /// Drops any cipher session and allows a new attempt.
    pub fn reset(&mut self) {
        self.state = HandshakeState::Disabled;
    }

    /// Drops an established cipher session but keeps `Unsupported` sticky.
    pub fn end_session(&mut self) {
        if !self.is_unsupported() {
            self.state = HandshakeState::Disabled;
        }
    }
}
