// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Camlink API Layer
//!
//! High-level batched command client for one camera.
//!
//! # Overview
//!
//! The API layer coordinates:
//! - Connection handling via the transport client
//! - Login, token lease tracking and logout
//! - The optional encrypted digest handshake
//! - Error handlers observing command failures
//!
//! # Example
//!
//! ```ignore
//! use camlink_core::api::{BatchDispatcher, ClientConfig};
//! use camlink_core::command::Request;
//!
//! let config = ClientConfig::new("192.168.1.20").with_credentials("admin", "secret");
//! let mut camera = BatchDispatcher::with_reqwest(config)?;
//! camera.login().await?;
//!
//! let responses = camera
//!     .dispatch_collect(vec![
//!         Request::new("GetTime"),
//!         Request::new("GetChannelstatus"),
//!     ])
//!     .await?;
//! println!("{} responses", responses.len());
//! ```
//!
//! # Module Structure
//!
//! - [`error`] - Error types for the API layer
//! - [`config`] - Client configuration
//! - [`handlers`] - Error handler callbacks
//! - [`output`] - Response and byte-chunk sequences
//! - [`dispatcher`] - Batch dispatcher

#[cfg(feature = "testing")]
pub mod config;
#[cfg(not(feature = "testing"))]
mod config;

#[cfg(feature = "testing")]
pub mod dispatcher;
#[cfg(not(feature = "testing"))]
mod dispatcher;

#[cfg(feature = "testing")]
pub mod error;
#[cfg(not(feature = "testing"))]
mod error;

#[cfg(feature = "testing")]
pub mod handlers;
#[cfg(not(feature = "testing"))]
mod handlers;

#[cfg(feature = "testing")]
pub mod output;
#[cfg(not(feature = "testing"))]
mod output;

pub use config::ClientConfig;
pub use dispatcher::BatchDispatcher;
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use handlers::{CallbackErrorHandler, ErrorHandler, ErrorHandlers};
pub use output::{ByteChunks, Dispatched, ResponseIter};
