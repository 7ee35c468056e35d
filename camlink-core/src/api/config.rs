//! Configuration for a device client

use std::time::Duration;

use zeroize::Zeroizing;

use crate::network::DEFAULT_MAX_REDIRECTS;

/// Configuration for one device connection.
#[derive(Clone)]
pub struct ClientConfig {
    /// Device hostname or IP address
    pub host: String,

    /// Port; defaults to 443 for HTTPS and 80 for HTTP
    pub port: Option<u16>,

    /// Force HTTPS (`Some(true)`) or HTTP (`Some(false)`); inferred from the port when unset
    pub use_https: Option<bool>,

    /// HTTP timeout per request
    pub timeout: Duration,

    /// Login username
    pub username: String,

    /// Login password (zeroized on drop)
    pub password: Zeroizing<String>,

    /// Try the encrypted digest handshake before plain login
    pub encrypt: bool,

    /// Maximum redirect hops per call
    pub max_redirects: u32,

    /// Accept self-signed device certificates
    pub accept_invalid_certs: bool,

    /// Chunk size for binary bodies (snapshots)
    pub binary_chunk_size: usize,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_https", &self.use_https)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("max_redirects", &self.max_redirects)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("binary_chunk_size", &self.binary_chunk_size)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            use_https: None,
            timeout: Duration::from_secs(30),
            username: "admin".to_string(),
            password: Zeroizing::new(String::new()),
            encrypt: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            accept_invalid_certs: true, // Cameras ship self-signed certificates
            binary_chunk_size: 64 * 1024, // 64 KiB
        }
    }
}

impl ClientConfig {
    /// Configuration for `host` with default settings
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set login credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = Zeroizing::new(password.into());
        self
    }

    /// Set an explicit port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Force HTTPS or HTTP regardless of the port
    pub fn with_https(mut self, use_https: bool) -> Self {
        self.use_https = Some(use_https);
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip the encrypted handshake and always log in with plain text
    pub fn without_encryption(mut self) -> Self {
        self.encrypt = false;
        self
    }

    /// Set the redirect hop limit
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Require valid TLS certificates
    pub fn with_strict_tls(mut self) -> Self {
        self.accept_invalid_certs = false;
        self
    }

    /// Validate settings that cannot be checked by the type system
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.username.is_empty() {
            return Err("username must not be empty".to_string());
        }
        if self.binary_chunk_size == 0 {
            return Err("binary_chunk_size must be positive".to_string());
        }
        Ok(())
    }
}
