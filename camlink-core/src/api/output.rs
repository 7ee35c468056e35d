// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Dispatch Results
//!
//! A batch call produces either typed responses or, for binary content
//! types, a byte-chunk sequence. Both are single-pass.

use std::iter::Zip;
use std::vec;

use futures::stream::{self, Stream};
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::handlers::ErrorHandlers;
use crate::codec;
use crate::command::{Request, Response};

/// Lazily decoded responses of one batch, in request order.
///
/// Each item is decoded from its raw JSON object only when pulled. Error
/// responses pass through the error handlers first and may be suppressed.
pub struct ResponseIter {
    pairs: Zip<vec::IntoIter<Request>, vec::IntoIter<Value>>,
    handlers: ErrorHandlers,
}

impl ResponseIter {
    pub(crate) fn new(requests: Vec<Request>, values: Vec<Value>, handlers: ErrorHandlers) -> Self {
        ResponseIter {
            pairs: requests.into_iter().zip(values),
            handlers,
        }
    }

    /// An empty sequence (empty batch).
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), ErrorHandlers::new())
    }

    /// Converts into an async stream.
    pub fn into_stream(self) -> impl Stream<Item = ApiResult<Response>> {
        stream::iter(self)
    }

    /// Collects every response, stopping at the first decode error.
    pub fn collect_responses(self) -> ApiResult<Vec<Response>> {
        self.collect()
    }
}

impl Iterator for ResponseIter {
    type Item = ApiResult<Response>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (request, value) = self.pairs.next()?;
            let envelope = match codec::envelope_from_value(value) {
                Ok(envelope) => envelope,
                Err(err) => return Some(Err(err.into())),
            };
            let response = Response::from_envelope(&request, envelope);
            if response.is_error() && self.handlers.suppresses(&response) {
                continue;
            }
            return Some(Ok(response));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.pairs.size_hint().1)
    }
}

/// Binary body split into fixed-size chunks.
pub struct ByteChunks {
    body: Vec<u8>,
    position: usize,
    chunk_size: usize,
    content_type: Option<String>,
}

impl ByteChunks {
    pub(crate) fn new(body: Vec<u8>, chunk_size: usize, content_type: Option<String>) -> Self {
        ByteChunks {
            body,
            position: 0,
            chunk_size: chunk_size.max(1),
            content_type,
        }
    }

    /// Total body length in bytes.
    pub fn total_len(&self) -> usize {
        self.body.len()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the unread remainder as one buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut body = self.body;
        body.drain(..self.position);
        body
    }

    /// Converts into an async stream.
    pub fn into_stream(self) -> impl Stream<Item = Vec<u8>> {
        stream::iter(self)
    }
}

impl Iterator for ByteChunks {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.position >= self.body.len() {
            return None;
        }
        let end = (self.position + self.chunk_size).min(self.body.len());
        let chunk = self.body[self.position..end].to_vec();
        self.position = end;
        Some(chunk)
    }
}

/// Result of one dispatched batch.
pub enum Dispatched {
    /// JSON command responses.
    Responses(ResponseIter),
    /// Raw binary body (e.g. a JPEG snapshot).
    Binary(ByteChunks),
}

impl Dispatched {
    /// Returns the responses, failing on a binary body.
    pub fn into_responses(self) -> ApiResult<ResponseIter> {
        match self {
            Dispatched::Responses(responses) => Ok(responses),
            Dispatched::Binary(chunks) => Err(ApiError::UnexpectedBinary(chunks.total_len())),
        }
    }

    /// Returns the binary body, if any.
    pub fn into_binary(self) -> Option<ByteChunks> {
        match self {
            Dispatched::Binary(chunks) => Some(chunks),
            Dispatched::Responses(_) => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Dispatched::Binary(_))
    }
}
