// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the dispatcher layer.
//!
//! Command-level failures are not errors; they arrive as
//! [`ResponseKind::Error`](crate::command::ResponseKind::Error) values.

use thiserror::Error;

use crate::codec::CodecError;
use crate::command::CommandError;
use crate::crypto::CryptoError;
use crate::network::NetworkError;

/// Unified error type for camlink operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failed (connection, timeout, HTTP status, redirects).
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Response body could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Payload encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The device rejected the login.
    #[error("login failed: {0}")]
    LoginFailed(CommandError),

    /// The login response carried no token.
    #[error("login response carried no token")]
    MissingToken,

    /// Operation needs a connection.
    #[error("not connected")]
    NotConnected,

    /// A binary body arrived where command responses were expected.
    #[error("unexpected binary response ({0} bytes)")]
    UnexpectedBinary(usize),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Coarse classification for retry decisions by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Timeout, refused, DNS. Retry with backoff.
    Connection,
    /// Malformed body, bad redirect target.
    Protocol,
    /// HTTP 4xx/5xx.
    HttpStatus,
    /// Credentials rejected.
    Authentication,
    /// Local misuse or configuration.
    Usage,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Network(NetworkError::HttpStatus { .. }) => ErrorCategory::HttpStatus,
            ApiError::Network(
                NetworkError::ConnectionFailed(_)
                | NetworkError::Timeout
                | NetworkError::NotConnected,
            ) => ErrorCategory::Connection,
            ApiError::Network(_) | ApiError::Codec(_) | ApiError::Crypto(_) => {
                ErrorCategory::Protocol
            }
            ApiError::UnexpectedBinary(_) => ErrorCategory::Protocol,
            ApiError::LoginFailed(_) | ApiError::MissingToken => ErrorCategory::Authentication,
            ApiError::NotConnected | ApiError::Configuration(_) => ErrorCategory::Usage,
        }
    }

    /// HTTP status, for status errors.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }
}

/// Result type for camlink operations.
pub type ApiResult<T> = Result<T, ApiError>;
