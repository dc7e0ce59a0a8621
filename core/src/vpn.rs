//! The management client: one method per management API operation.
//!
//! # Design
//! `OutlineVpn` pairs the I/O-free `ManagementApi` with a `Transport` and
//! holds nothing else, so a single instance can be shared between threads
//! when the transport allows it. Every method issues its request(s)
//! immediately; there is no caching, retrying or back-off.
//!
//! Two result shapes are kept apart on purpose. Operations that return data
//! (or, for the port setter, distinguish failure causes) return
//! `Result<T>` and fail with `Error::Server`. Toggle operations return
//! `Result<bool>`: `Ok(false)` for any non-204 status, `Err` only when the
//! transport produced no response.

use tracing::warn;

use crate::client::ManagementApi;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::HttpRequest;
use crate::pinning;
use crate::transport::{Transport, UreqTransport};
use crate::types::{OutlineKey, ServerInfo, TransferMetrics};

/// Client for one Outline server's management API.
#[derive(Debug, Clone)]
pub struct OutlineVpn<T = UreqTransport> {
    api: ManagementApi,
    transport: T,
}

impl OutlineVpn<UreqTransport> {
    /// Connects to `api_url` with the default configuration.
    ///
    /// When `cert_sha256` is given the server certificate is checked before
    /// the client is returned; a mismatch fails with
    /// `Error::CertificateMismatch` and no management call is made.
    pub fn new(api_url: &str, cert_sha256: Option<&str>) -> Result<Self> {
        Self::with_config(api_url, cert_sha256, &ClientConfig::default())
    }

    pub fn with_config(api_url: &str, cert_sha256: Option<&str>, config: &ClientConfig) -> Result<Self> {
        if let Some(expected) = cert_sha256 {
            pinning::check_fingerprint(api_url, expected, config)?;
        }
        Ok(Self::with_transport(api_url, UreqTransport::new(config)))
    }
}

impl<T: Transport> OutlineVpn<T> {
    /// Builds a client over an arbitrary transport. No pinning is performed.
    pub fn with_transport(api_url: &str, transport: T) -> Self {
        Self {
            api: ManagementApi::new(api_url),
            transport,
        }
    }

    fn toggle(&self, request: HttpRequest) -> Result<bool> {
        let response = self.transport.execute(&request)?;
        Ok(self.api.is_success(&response))
    }

    /// All keys, each joined with its transferred bytes.
    pub fn get_keys(&self) -> Result<Vec<OutlineKey>> {
        let response = self.transport.execute(&self.api.build_list_keys())?;
        let keys = self.api.parse_list_keys(&response)?;
        let metrics = self.get_transferred_data()?;

        Ok(keys
            .into_iter()
            .map(|key| {
                let used = metrics.bytes_for(&key.id);
                OutlineKey::from_access_key(key, used)
            })
            .collect())
    }

    /// Creates a key, then renames it when `name` is given.
    ///
    /// A failed rename is not an error: the returned key keeps the name the
    /// server assigned.
    pub fn create_key(&self, name: Option<&str>) -> Result<OutlineKey> {
        let response = self.transport.execute(&self.api.build_create_key())?;
        let mut key = OutlineKey::from_access_key(self.api.parse_create_key(&response)?, Some(0));

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            match self.rename_key(&key.key_id, name) {
                Ok(true) => key.name = name.to_string(),
                Ok(false) => warn!(key_id = %key.key_id, "rename after create rejected"),
                Err(e) => warn!(key_id = %key.key_id, error = %e, "rename after create failed"),
            }
        }
        Ok(key)
    }

    pub fn delete_key(&self, key_id: &str) -> Result<bool> {
        self.toggle(self.api.build_delete_key(key_id))
    }

    pub fn rename_key(&self, key_id: &str, name: &str) -> Result<bool> {
        self.toggle(self.api.build_rename_key(key_id, name))
    }

    pub fn add_data_limit(&self, key_id: &str, limit_bytes: u64) -> Result<bool> {
        self.toggle(self.api.build_add_data_limit(key_id, limit_bytes)?)
    }

    pub fn delete_data_limit(&self, key_id: &str) -> Result<bool> {
        self.toggle(self.api.build_delete_data_limit(key_id))
    }

    /// Bytes transferred per key id.
    pub fn get_transferred_data(&self) -> Result<TransferMetrics> {
        let response = self.transport.execute(&self.api.build_transfer_metrics())?;
        self.api.parse_transfer_metrics(&response)
    }

    pub fn get_server_information(&self) -> Result<ServerInfo> {
        let response = self.transport.execute(&self.api.build_server_info())?;
        self.api.parse_server_info(&response)
    }

    pub fn set_server_name(&self, name: &str) -> Result<bool> {
        self.toggle(self.api.build_set_server_name(name)?)
    }

    /// Changes the hostname embedded in access URLs. Must be a valid
    /// hostname or IP address.
    pub fn set_hostname(&self, hostname: &str) -> Result<bool> {
        self.toggle(self.api.build_set_hostname(hostname)?)
    }

    /// Whether the server shares metrics.
    pub fn get_metrics_status(&self) -> Result<bool> {
        let response = self.transport.execute(&self.api.build_metrics_status())?;
        self.api.parse_metrics_status(&response)
    }

    pub fn set_metrics_status(&self, enabled: bool) -> Result<bool> {
        self.toggle(self.api.build_set_metrics_status(enabled)?)
    }

    /// Changes the default port for keys created from now on.
    ///
    /// Fails with `Error::Server` on 400 (invalid port) and 409 (port in use
    /// by another service); any other non-204 status is `Ok(false)`.
    pub fn set_port_new_for_access_keys(&self, port: u16) -> Result<bool> {
        let request = self.api.build_set_port_for_new_access_keys(port)?;
        let response = self.transport.execute(&request)?;
        self.api.parse_set_port_for_new_access_keys(&response)
    }

    pub fn set_data_limit_for_all_keys(&self, limit_bytes: u64) -> Result<bool> {
        self.toggle(self.api.build_set_data_limit_for_all_keys(limit_bytes)?)
    }

    pub fn delete_data_limit_for_all_keys(&self) -> Result<bool> {
        self.toggle(self.api.build_delete_data_limit_for_all_keys())
    }
}
