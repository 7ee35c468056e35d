//! Transport Traits
//!
//! HTTP abstraction for the command endpoint.
//!
//! The transport client talks to an [`HttpSession`] opened by an
//! [`HttpConnector`]. Production code uses the reqwest-backed connector;
//! tests script replies with the mock connector.

use std::time::Duration;

use async_trait::async_trait;
use ring::digest::{digest, SHA256};
use url::Url;

use super::error::NetworkError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Fixed path of the command endpoint.
pub const API_PATH: &str = "/cgi-bin/api.cgi";

/// URL scheme of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Resolves the scheme for a connect call.
    ///
    /// An explicit encryption flag wins; otherwise port 443 means HTTPS and
    /// anything else means HTTP.
    pub fn resolve(port: Option<u16>, encryption: Option<bool>) -> Self {
        match (encryption, port) {
            (Some(true), _) => Scheme::Https,
            (Some(false), _) => Scheme::Http,
            (None, Some(443)) => Scheme::Https,
            (None, _) => Scheme::Http,
        }
    }

    pub fn from_url_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Scheme::Http),
            "https" => Some(Scheme::Https),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(self) -> bool {
        self == Scheme::Https
    }
}

/// Identity of one physical connection.
///
/// Two connects resolving to the same identity share one HTTP session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl ConnectionIdentity {
    /// Builds the identity for `connect(host, port, encryption)`.
    pub fn resolve(host: &str, port: Option<u16>, encryption: Option<bool>) -> Self {
        let scheme = Scheme::resolve(port, encryption);
        ConnectionIdentity {
            scheme,
            host: host.to_string(),
            port: port.unwrap_or_else(|| scheme.default_port()),
        }
    }

    /// Builds the identity a URL points at.
    pub fn from_url(url: &Url) -> TransportResult<Self> {
        let scheme = Scheme::from_url_scheme(url.scheme())
            .ok_or_else(|| NetworkError::InvalidRedirect(format!("unsupported scheme in {url}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| NetworkError::InvalidRedirect(format!("no host in {url}")))?;
        Ok(ConnectionIdentity {
            scheme,
            host: host.to_string(),
            port: url.port().unwrap_or_else(|| scheme.default_port()),
        })
    }

    /// Base URL (`scheme://host:port`) for this connection.
    pub fn base_url(&self) -> TransportResult<Url> {
        let raw = format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port);
        Url::parse(&raw).map_err(|e| NetworkError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Stable hash of the identity (hex SHA-256 of `scheme://host:port`).
    pub fn fingerprint(&self) -> String {
        let raw = format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port);
        hex::encode(digest(&SHA256, raw.as_bytes()).as_ref())
    }
}

/// HTTP method of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the value of a query parameter.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// One HTTP response with the body fully read.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Creates a JSON response.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        HttpResponse::new(status, body.to_string())
            .with_header("Content-Type", "application/json")
    }

    /// Creates a redirect to `location`.
    pub fn redirect(status: u16, location: &str) -> Self {
        HttpResponse::new(status, Vec::new()).with_header("Location", location)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Looks up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An open HTTP session bound to one base URL.
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// Performs one request and reads the whole body.
    ///
    /// Must not follow redirects; the transport client handles them.
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse>;

    /// Releases the session. Safe to call more than once.
    fn close(&mut self) {}
}

/// Opens HTTP sessions.
pub trait HttpConnector: Send + Sync {
    type Session: HttpSession;

    /// Opens a session for `base_url` with a per-request timeout.
    fn open(&self, base_url: &Url, timeout: Duration) -> TransportResult<Self::Session>;
}
