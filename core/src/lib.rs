//! Synchronous client for the Outline VPN server management API.
//!
//! # Overview
//! `OutlineVpn` exposes the management API as typed operations: create,
//! list, rename and delete access keys, manage per-key and server-wide data
//! limits, and read or change server settings. The server is the single
//! source of truth; nothing is cached between calls.
//!
//! # Design
//! - `ManagementApi` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `Transport` executes requests; `UreqTransport` is the default and skips
//!   certificate-chain validation because management endpoints are
//!   self-signed.
//! - An optional SHA-256 fingerprint is checked once, at construction, by
//!   `pinning::check_fingerprint`.
//! - Data-returning operations return `Result<T>`; toggles return
//!   `Result<bool>` and report rejected requests as `Ok(false)`.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pinning;
pub mod transport;
pub mod types;
pub mod vpn;

pub use client::ManagementApi;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{AccessKey, DataLimit, OutlineKey, ServerInfo, TransferMetrics};
pub use vpn::OutlineVpn;
