//! Network + Transport Layer
//!
//! Carries encoded command batches to the device's command endpoint.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **HTTP traits**: `HttpConnector`/`HttpSession`, the seam to the HTTP stack
//! - **Reqwest backend**: production connector
//! - **Mock backend**: scripted connector for tests
//! - **Routing**: force-GET predicates and query building
//! - **Transport client**: connection identity, redirects, status classification
//!
//! # Example
//!
//! ```ignore
//! use camlink_core::network::{MockConnector, TransportClient};
//!
//! let connector = MockConnector::new();
//! let mut transport = TransportClient::new(connector);
//! transport.connect("192.168.1.20", Some(443), Duration::from_secs(10), None)?;
//! let response = transport.send(&call).await?;
//! ```

#[cfg(feature = "testing")]
pub mod client;
#[cfg(not(feature = "testing"))]
mod client;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod http;
#[cfg(not(feature = "testing"))]
mod http;

#[cfg(feature = "testing")]
pub mod mock;
#[cfg(not(feature = "testing"))]
mod mock;

pub mod routing;

#[cfg(feature = "testing")]
pub mod transport;
#[cfg(not(feature = "testing"))]
mod transport;

// Error types
pub use error::NetworkError;

// HTTP abstraction
pub use transport::{
    ConnectionIdentity, HttpConnector, HttpMethod, HttpRequest, HttpResponse, HttpSession,
    Scheme, TransportResult, API_PATH,
};

// Reqwest backend for production
pub use http::{ReqwestConnector, ReqwestSession};

// Mock backend for testing
pub use mock::{MockConnector, MockSession};

// Routing
pub use routing::{
    ForceGetPredicate, LoginRoute, ResolvedRoute, RouteContext, RouteDecision, SnapshotRoute,
};

// Transport client
pub use client::{DisconnectObserver, OutgoingCall, TransportClient, DEFAULT_MAX_REDIRECTS};
