//! Reqwest HTTP backend
//!
//! Production [`HttpConnector`] built on `reqwest`:
//! - Redirects are never followed by reqwest (the transport client does it)
//! - Per-request timeout from the connect call
//! - Self-signed device certificates accepted unless disabled

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use url::Url;

use super::error::NetworkError;
use super::transport::{
    HttpConnector, HttpMethod, HttpRequest, HttpResponse, HttpSession, TransportResult,
};

/// Opens reqwest-backed sessions.
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    accept_invalid_certs: bool,
    user_agent: String,
}

impl Default for ReqwestConnector {
    fn default() -> Self {
        ReqwestConnector {
            accept_invalid_certs: true,
            user_agent: format!(
                "Camlink/{}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
            ),
        }
    }
}

impl ReqwestConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require valid TLS certificates.
    pub fn with_strict_tls(mut self) -> Self {
        self.accept_invalid_certs = false;
        self
    }

    /// Sets whether invalid (self-signed) certificates are accepted.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

impl HttpConnector for ReqwestConnector {
    type Session = ReqwestSession;

    fn open(&self, base_url: &Url, timeout: Duration) -> TransportResult<ReqwestSession> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(map_reqwest_error)?;

        Ok(ReqwestSession {
            client: Some(client),
            base_url: base_url.clone(),
        })
    }
}

/// A reqwest client bound to one base URL.
pub struct ReqwestSession {
    client: Option<Client>,
    base_url: Url,
}

impl ReqwestSession {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let client = self.client.as_ref().ok_or(NetworkError::NotConnected)?;

        let mut builder = match request.method {
            HttpMethod::Get => client.get(request.url),
            HttpMethod::Post => client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&mut self) {
        self.client = None;
    }
}

fn map_reqwest_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::ConnectionFailed(err.to_string())
    }
}
