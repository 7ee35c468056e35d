// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Digest Challenge (RFC 2617 style)
//!
//! Parses the `WWW-Authenticate: Digest ...` challenge returned by the login
//! probe, computes the MD5 digest response, and derives the payload key.

use md5::{Digest, Md5};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;

use super::cipher::{CipherKey, CryptoError, KEY_SIZE};
use crate::command::{Request, LOGIN_COMMAND};

/// Default nonce count when the challenge omits `nc`.
pub const DEFAULT_NC: &str = "00000001";
/// Default quality of protection when the challenge omits `qop`.
pub const DEFAULT_QOP: &str = "auth";

/// Lowercase hex MD5 of a string.
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Fresh client nonce (16 random bytes, hex).
pub fn generate_cnonce() -> Result<String, CryptoError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CryptoError::Rng)?;
    Ok(hex::encode(bytes))
}

/// Splits `key="value", key=value` pairs, honouring quotes.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ',') {
            key.push(c);
        }
        if key.trim().is_empty() {
            break;
        }
        if chars.next_if_eq(&'=').is_none() {
            continue;
        }

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    other => value.push(other),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                value.push(c);
            }
        }

        params.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    params
}

/// Parsed challenge plus the request details the digest is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: String,
    pub nc: String,
    pub cnonce: String,
    pub uri: String,
    pub method: String,
}

impl DigestChallenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// `method` and `uri` are those of the probe request that drew the challenge.
    pub fn parse(
        header: &str,
        method: &str,
        uri: &str,
        cnonce: String,
    ) -> Result<Self, CryptoError> {
        let header = header.trim();
        let scheme_end = header.find(char::is_whitespace).unwrap_or(header.len());
        if !header[..scheme_end].eq_ignore_ascii_case("digest") {
            return Err(CryptoError::InvalidChallenge(
                "not a Digest challenge".to_string(),
            ));
        }

        let params = parse_params(&header[scheme_end..]);
        let find = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        let realm = find("realm")
            .ok_or_else(|| CryptoError::InvalidChallenge("missing realm".to_string()))?;
        let nonce = find("nonce")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CryptoError::InvalidChallenge("missing nonce".to_string()))?;
        // "auth,auth-int" offers: use the first
        let qop = find("qop")
            .and_then(|q| q.split(',').next().map(|s| s.trim().to_string()))
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| DEFAULT_QOP.to_string());
        let nc = find("nc").unwrap_or_else(|| DEFAULT_NC.to_string());

        Ok(DigestChallenge {
            realm,
            nonce,
            qop,
            nc,
            cnonce,
            uri: uri.to_string(),
            method: method.to_string(),
        })
    }

    /// `md5("{user}:{realm}:{password}")`
    pub fn ha1(&self, username: &str, password: &str) -> String {
        md5_hex(&format!("{}:{}:{}", username, self.realm, password))
    }

    /// `md5("{method}:{uri}")`
    pub fn ha2(&self) -> String {
        md5_hex(&format!("{}:{}", self.method, self.uri))
    }

    /// `md5("{HA1}:{nonce}:{nc}:{cnonce}:{qop}:{HA2}")`
    pub fn response(&self, username: &str, password: &str) -> String {
        md5_hex(&format!(
            "{}:{}:{}:{}:{}:{}",
            self.ha1(username, password),
            self.nonce,
            self.nc,
            self.cnonce,
            self.qop,
            self.ha2()
        ))
    }

    /// First 16 hex characters of `md5("{nonce}-{password}-{cnonce}")`, upper-cased.
    pub fn session_key(&self, password: &str) -> CipherKey {
        let hash = md5_hex(&format!("{}-{}-{}", self.nonce, password, self.cnonce))
            .to_ascii_uppercase();
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&hash.as_bytes()[..KEY_SIZE]);
        CipherKey::from_bytes(bytes)
    }

    /// Builds the second login request carrying the digest fields.
    pub fn login_request(&self, username: &str, password: &str) -> Request {
        let digest = DigestLogin {
            user_name: username,
            realm: &self.realm,
            method: &self.method,
            uri: &self.uri,
            nonce: &self.nonce,
            nc: &self.nc,
            cnonce: &self.cnonce,
            qop: &self.qop,
            response: self.response(username, password),
        };
        let value = serde_json::to_value(digest).unwrap_or(serde_json::Value::Null);
        Request::new(LOGIN_COMMAND).with_param("Digest", value)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DigestLogin<'a> {
    user_name: &'a str,
    realm: &'a str,
    method: &'a str,
    uri: &'a str,
    nonce: &'a str,
    nc: &'a str,
    cnonce: &'a str,
    qop: &'a str,
    response: String,
}
