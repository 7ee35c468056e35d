// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Codec
//!
//! Batch framing for the command API.
//!
//! Outgoing batches are always a JSON array, even for a single command.
//! Incoming bodies may be either an array or a bare object; a bare object is
//! normalized to a one-element batch. Order is preserved in both directions.

use serde_json::Value;
use thiserror::Error;

use crate::command::{RawResponseEnvelope, Request};

/// Codec error types.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a response body should be interpreted, judged by its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `application/json`: array or object.
    Json,
    /// `text/*`: the device's JSON served as text; must be an array.
    Text,
    /// Anything else (JPEG snapshots, firmware files).
    Binary,
}

impl PayloadKind {
    /// Classifies a `Content-Type` header value. A missing header is treated as JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return PayloadKind::Json;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || mime.ends_with("+json") {
            PayloadKind::Json
        } else if mime.starts_with("text/") {
            PayloadKind::Text
        } else {
            PayloadKind::Binary
        }
    }
}

/// Serializes a batch to a JSON array.
pub fn encode(requests: &[Request]) -> Vec<u8> {
    let batch: Vec<Value> = requests.iter().map(Request::to_wire).collect();
    // Serializing a Vec<Value> cannot fail.
    serde_json::to_vec(&batch).unwrap_or_else(|_| b"[]".to_vec())
}

/// Splits a JSON body into its raw response objects without interpreting them.
///
/// Accepts an array or a single object.
pub fn decode_values(body: &[u8]) -> Result<Vec<Value>, CodecError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => Ok(items),
        object @ Value::Object(_) => Ok(vec![object]),
        other => Err(CodecError::Malformed(format!(
            "expected JSON array or object, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Like [`decode_values`], but enforces the framing rules of the content type.
///
/// Text bodies must start with `[`; binary bodies are rejected.
pub fn decode_values_with_content_type(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<Vec<Value>, CodecError> {
    match PayloadKind::from_content_type(content_type) {
        PayloadKind::Json => decode_values(body),
        PayloadKind::Text => {
            let first = body.iter().find(|b| !b.is_ascii_whitespace());
            if first != Some(&b'[') {
                return Err(CodecError::Malformed(format!(
                    "text payload does not start with '[': {}",
                    preview(body)
                )));
            }
            decode_values(body)
        }
        PayloadKind::Binary => Err(CodecError::Malformed(format!(
            "unexpected binary content type {}",
            content_type.unwrap_or_default()
        ))),
    }
}

/// Converts one raw object into an envelope.
pub fn envelope_from_value(value: Value) -> Result<RawResponseEnvelope, CodecError> {
    Ok(serde_json::from_value(value)?)
}

/// Decodes a JSON body into envelopes, preserving order.
pub fn decode(body: &[u8]) -> Result<Vec<RawResponseEnvelope>, CodecError> {
    decode_values(body)?
        .into_iter()
        .map(envelope_from_value)
        .collect()
}

/// Decodes a body using the framing rules of its content type.
pub fn decode_with_content_type(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<Vec<RawResponseEnvelope>, CodecError> {
    decode_values_with_content_type(body, content_type)?
        .into_iter()
        .map(envelope_from_value)
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(&body[..body.len().min(64)]);
    text.trim().to_string()
}
