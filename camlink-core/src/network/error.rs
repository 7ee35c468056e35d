// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types

use thiserror::Error;

/// Errors raised by the transport.
///
/// None of these are retried internally; the only automatic repeat is the
/// bounded redirect follow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Refused, DNS failure, TLS failure, connection reset.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Transport not connected")]
    NotConnected,

    /// HTTP 4xx (`fatal == false`) or 5xx (`fatal == true`).
    #[error("HTTP status {status}")]
    HttpStatus { status: u16, fatal: bool },

    #[error("Redirect response without Location header")]
    RedirectWithoutLocation,

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Too many redirects ({0})")]
    TooManyRedirects(u32),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl NetworkError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        NetworkError::HttpStatus {
            status,
            fatal: status >= 500,
        }
    }

    /// Returns the HTTP status, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for 5xx responses.
    pub fn is_fatal_server_error(&self) -> bool {
        matches!(self, NetworkError::HttpStatus { fatal: true, .. })
    }

    /// Returns true for 4xx responses (authentication or client errors).
    pub fn is_auth_or_client_error(&self) -> bool {
        matches!(self, NetworkError::HttpStatus { fatal: false, .. })
    }
}
