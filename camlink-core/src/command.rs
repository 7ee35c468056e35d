// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command Types
//!
//! Transport-independent command values exchanged with the device.
//!
//! Feature code builds [`Request`] values; the dispatcher turns the decoded
//! wire envelopes back into [`Response`] values carrying the originating
//! request's correlation ID. Per-command failures are data
//! ([`ResponseKind::Error`]), never a Rust error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Correlation identifier linking a response to its request (UUID v4).
pub type RequestId = String;

/// Command name of the login call.
pub const LOGIN_COMMAND: &str = "Login";
/// Command name of the logout call.
pub const LOGOUT_COMMAND: &str = "Logout";
/// Command name of the snapshot call (binary JPEG response).
pub const SNAPSHOT_COMMAND: &str = "Snap";

/// How much detail the device should include in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseDetail {
    /// Only the current `value` (`action = 0`).
    #[default]
    ValueOnly,
    /// `value` plus `initial` and `range` metadata (`action = 1`).
    Detailed,
}

impl ResponseDetail {
    /// Returns the wire `action` value.
    pub fn action(self) -> u8 {
        match self {
            ResponseDetail::ValueOnly => 0,
            ResponseDetail::Detailed => 1,
        }
    }
}

/// A single named command with parameters.
///
/// Requests are immutable once built; the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: RequestId,
    command: String,
    detail: ResponseDetail,
    parameters: Map<String, Value>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    cmd: &'a str,
    action: u8,
    param: &'a Map<String, Value>,
}

impl Request {
    /// Creates a value-only request with no parameters.
    pub fn new(command: impl Into<String>) -> Self {
        Request {
            id: uuid::Uuid::new_v4().to_string(),
            command: command.into(),
            detail: ResponseDetail::ValueOnly,
            parameters: Map::new(),
        }
    }

    /// Asks for a detailed response (`initial`/`range` included).
    pub fn detailed(mut self) -> Self {
        self.detail = ResponseDetail::Detailed;
        self
    }

    /// Adds one parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole parameter map.
    pub fn with_params(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Builds the plain-text login command.
    pub fn login(username: &str, password: &str) -> Self {
        Request::new(LOGIN_COMMAND).with_param(
            "User",
            serde_json::json!({
                "Version": "0",
                "userName": username,
                "password": password,
            }),
        )
    }

    /// Builds the version-only login probe used to request a digest challenge.
    pub fn login_probe() -> Self {
        Request::new(LOGIN_COMMAND).with_param("Version", 1)
    }

    /// Builds the logout command.
    pub fn logout() -> Self {
        Request::new(LOGOUT_COMMAND)
    }

    /// Builds a snapshot command for a channel.
    pub fn snapshot(channel: u32) -> Self {
        Request::new(SNAPSHOT_COMMAND).with_param("channel", channel)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn detail(&self) -> ResponseDetail {
        self.detail
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Returns one parameter by key.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// Returns true for `Login` commands.
    pub fn is_login(&self) -> bool {
        self.command == LOGIN_COMMAND
    }

    /// Serializes to the wire object `{"cmd", "action", "param"}`.
    pub fn to_wire(&self) -> Value {
        let wire = WireRequest {
            cmd: &self.command,
            action: self.detail.action(),
            param: &self.parameters,
        };
        // A map of JSON values always serializes.
        serde_json::to_value(wire).unwrap_or(Value::Null)
    }
}

/// Command-level error object inside a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    #[serde(rename = "rspCode")]
    pub rsp_code: i64,
    #[serde(default)]
    pub detail: String,
}

/// One response object exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponseEnvelope {
    #[serde(rename = "cmd", default)]
    pub command: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl RawResponseEnvelope {
    /// Creates a successful value-only envelope.
    pub fn success(command: impl Into<String>, value: Value) -> Self {
        RawResponseEnvelope {
            command: command.into(),
            code: 0,
            value: Some(value),
            initial: None,
            range: None,
            error: None,
        }
    }

    /// Creates a failed envelope carrying an error object.
    pub fn failure(command: impl Into<String>, rsp_code: i64, detail: impl Into<String>) -> Self {
        RawResponseEnvelope {
            command: command.into(),
            code: 1,
            value: None,
            initial: None,
            range: None,
            error: Some(WireError {
                rsp_code,
                detail: detail.into(),
            }),
        }
    }

    /// Returns true if the envelope reports success.
    pub fn is_success(&self) -> bool {
        self.code == 0 && self.error.is_none()
    }

    /// Returns true if `initial` or `range` metadata is present.
    pub fn is_detailed(&self) -> bool {
        self.initial.is_some() || self.range.is_some()
    }
}

/// Known device error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Session limit reached on the device.
    MaxSession,
    /// Command requires a valid token ("please login first").
    AuthRequired,
    /// Login rejected.
    LoginFailed,
    /// Command not supported by this firmware.
    NotSupported,
    /// Username or password wrong.
    PasswordWrong,
    /// Any other `rspCode`.
    Other(i64),
}

impl ErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            -5 => ErrorCode::MaxSession,
            -6 => ErrorCode::AuthRequired,
            -7 => ErrorCode::LoginFailed,
            -9 => ErrorCode::NotSupported,
            -502 => ErrorCode::PasswordWrong,
            other => ErrorCode::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ErrorCode::MaxSession => -5,
            ErrorCode::AuthRequired => -6,
            ErrorCode::LoginFailed => -7,
            ErrorCode::NotSupported => -9,
            ErrorCode::PasswordWrong => -502,
            ErrorCode::Other(code) => code,
        }
    }
}

/// A failed command, returned as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub command: String,
    pub rsp_code: i64,
    pub detail: String,
}

impl CommandError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::from_code(self.rsp_code)
    }

    /// Returns true for bad-credential and login-required errors.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::AuthRequired | ErrorCode::LoginFailed | ErrorCode::PasswordWrong
        )
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed with code {}: {}",
            self.command, self.rsp_code, self.detail
        )
    }
}

/// Decoded payload of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    /// Value-only success.
    Value(Value),
    /// Success with `initial`/`range` metadata.
    Detailed {
        value: Value,
        initial: Option<Value>,
        range: Option<Value>,
    },
    /// The device rejected the command.
    Error(CommandError),
}

/// Typed response to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    request_id: RequestId,
    command: String,
    code: i64,
    kind: ResponseKind,
}

impl Response {
    /// Wraps an envelope, correlating it with the request at the same position.
    pub fn from_envelope(request: &Request, envelope: RawResponseEnvelope) -> Self {
        let command = if envelope.command.is_empty() {
            request.command().to_string()
        } else {
            envelope.command
        };

        let kind = match envelope.error {
            Some(error) => ResponseKind::Error(CommandError {
                command: command.clone(),
                rsp_code: error.rsp_code,
                detail: error.detail,
            }),
            None if envelope.code != 0 => ResponseKind::Error(CommandError {
                command: command.clone(),
                rsp_code: envelope.code,
                detail: String::new(),
            }),
            None if envelope.initial.is_some() || envelope.range.is_some() => {
                ResponseKind::Detailed {
                    value: envelope.value.unwrap_or(Value::Null),
                    initial: envelope.initial,
                    range: envelope.range,
                }
            }
            None => ResponseKind::Value(envelope.value.unwrap_or(Value::Null)),
        };

        Response {
            request_id: request.id().to_string(),
            command,
            code: envelope.code,
            kind,
        }
    }

    /// ID of the originating request.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ResponseKind::Error(_))
    }

    pub fn error(&self) -> Option<&CommandError> {
        match &self.kind {
            ResponseKind::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the `value` object of a successful response.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            ResponseKind::Value(value) | ResponseKind::Detailed { value, .. } => Some(value),
            ResponseKind::Error(_) => None,
        }
    }

    pub fn initial(&self) -> Option<&Value> {
        match &self.kind {
            ResponseKind::Detailed { initial, .. } => initial.as_ref(),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<&Value> {
        match &self.kind {
            ResponseKind::Detailed { range, .. } => range.as_ref(),
            _ => None,
        }
    }

    /// Parses the `value` object into a feature-specific struct.
    ///
    /// Error responses parse as `null`, which fails for any struct type.
    pub fn parse_value<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.value().cloned().unwrap_or(Value::Null))
    }

    /// Extracts the token of a successful login response.
    pub fn login_token(&self) -> Option<LoginToken> {
        if self.command != LOGIN_COMMAND {
            return None;
        }
        self.parse_value::<LoginValue>().ok().map(|v| v.token)
    }
}

#[derive(Deserialize)]
struct LoginValue {
    #[serde(rename = "Token")]
    token: LoginToken,
}

/// Bearer token returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginToken {
    pub name: String,
    #[serde(rename = "leaseTime")]
    pub lease_time: u64,
    /// Seed for the anti-replay counters (encrypted sessions only).
    #[serde(rename = "checkBasic", default)]
    pub check_basic: Option<u64>,
    /// Number of anti-replay counter slots (encrypted sessions only).
    #[serde(rename = "countTotal", default)]
    pub count_total: Option<usize>,
}
