//! Error types for the Outline management client.
//!
//! # Design
//! `Server` and `CertificateMismatch` are the two failures callers are
//! expected to match on. `Server` carries the human-readable message the
//! management API contract associates with each failing operation; it is
//! only raised by operations that return data or distinguish port failures.
//! Toggle operations never produce `Server`, they report `Ok(false)`.
//!
//! The remaining variants cover conditions where no HTTP response exists at
//! all (transport, pinning handshake, bad URL) or where local JSON handling
//! failed outside of the field-presence checks.

use thiserror::Error;

pub const UNABLE_TO_RETRIEVE_KEYS: &str = "Unable to retrieve keys";
pub const UNABLE_TO_GET_METRICS: &str = "Unable to get metrics";
pub const UNABLE_TO_CREATE_KEY: &str = "Unable to create key";
pub const UNABLE_TO_GET_SERVER_INFO: &str = "Unable to get information about the server";
pub const INVALID_PORT: &str = "The requested port wasn't an integer from 1 through 65535, or the request had no port parameter.";
pub const PORT_IN_USE: &str = "The requested port was already in use by another service.";

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by `OutlineVpn` and the `ManagementApi` parsers.
#[derive(Debug, Error)]
pub enum Error {
    /// The management API answered with an unexpected status or body.
    #[error("{0}")]
    Server(String),

    /// The pinned fingerprint does not match the presented certificate.
    #[error("certificate fingerprint mismatch: expected {expected}, got {actual}")]
    CertificateMismatch { expected: String, actual: String },

    /// The one-shot TLS handshake used for pinning failed.
    #[error("certificate retrieval failed: {0}")]
    Certificate(String),

    /// No HTTP response was obtained (DNS, refused connection, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The base URL could not be split into host and port.
    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A response body could not be deserialized into the expected record.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl Error {
    pub(crate) fn server(message: &str) -> Self {
        Error::Server(message.to_string())
    }
}

impl From<ureq::Error> for Error {
    fn from(error: ureq::Error) -> Self {
        Error::Transport(error.to_string())
    }
}

impl From<rustls::Error> for Error {
    fn from(error: rustls::Error) -> Self {
        Error::Certificate(error.to_string())
    }
}
