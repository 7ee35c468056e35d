//! Camlink Core Library
//!
//! Command transport and session handling for the JSON-over-HTTP API of
//! network cameras. Commands are batched into one HTTP call, responses are
//! matched back by position, and the login token lease is tracked locally.
//! Hashing and randomness use the audited `ring` crate.

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub mod api;
pub mod codec;
pub mod command;
pub mod crypto;
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub mod network;
pub mod session;

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use api::{
    ApiError, ApiResult, BatchDispatcher, ByteChunks, CallbackErrorHandler, ClientConfig,
    Dispatched, ErrorCategory, ErrorHandler, ResponseIter,
};
pub use codec::{CodecError, PayloadKind};
pub use command::{
    CommandError, ErrorCode, LoginToken, Request, RequestId, Response, ResponseDetail,
    ResponseKind,
};
pub use crypto::{CipherKey, CipherSession, CryptoError, DigestChallenge, EncryptedHandshake};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use network::{
    ConnectionIdentity, DisconnectObserver, ForceGetPredicate, HttpConnector, MockConnector,
    NetworkError, ReqwestConnector, TransportClient,
};
pub use session::{Clock, ManualClock, SessionManager, SessionState, SystemClock};
