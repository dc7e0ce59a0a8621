//! Wire records and domain types for the Outline management API.
//!
//! # Design
//! Every endpoint gets its own typed record so a missing required field is a
//! decode error instead of a silently absent value. Wire records use the
//! server's camelCase names; `OutlineKey` is the joined view handed to
//! callers and uses plain snake_case.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A byte cap enforced by the server, per key or for all keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataLimit {
    pub bytes: u64,
}

/// One access key as returned by `GET /access-keys/` and `POST /access-keys/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    #[serde(deserialize_with = "key_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_limit: Option<DataLimit>,
}

/// Body of `GET /access-keys/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyList {
    pub access_keys: Vec<AccessKey>,
}

/// Body of `GET /metrics/transfer`, keyed by access-key id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferMetrics {
    pub bytes_transferred_by_user_id: HashMap<String, u64>,
}

impl TransferMetrics {
    pub fn bytes_for(&self, key_id: &str) -> Option<u64> {
        self.bytes_transferred_by_user_id.get(key_id).copied()
    }
}

/// Body of `GET /server`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_data_limit: Option<DataLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_for_new_access_keys: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_for_access_keys: Option<String>,
}

/// Body of `GET /metrics/enabled` and of `PUT /metrics/enabled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEnabled {
    pub metrics_enabled: bool,
}

/// Body of `PUT /name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetServerName {
    pub name: String,
}

/// Body of `PUT /server/hostname-for-access-keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetHostname {
    pub hostname: String,
}

/// Body of `PUT /server/port-for-new-access-keys`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetPort {
    pub port: u16,
}

/// Body of both data-limit `PUT` endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetDataLimit {
    pub limit: DataLimit,
}

/// An access key joined with its transfer metrics.
///
/// `used_bytes` is a snapshot taken when the key was fetched. It is `None`
/// when the metrics endpoint had no entry for the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutlineKey {
    pub key_id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
    pub used_bytes: Option<u64>,
    pub data_limit: Option<DataLimit>,
}

impl OutlineKey {
    pub fn from_access_key(key: AccessKey, used_bytes: Option<u64>) -> Self {
        Self {
            key_id: key.id,
            name: key.name,
            password: key.password,
            port: key.port,
            method: key.method,
            access_url: key.access_url,
            used_bytes,
            data_limit: key.data_limit,
        }
    }
}

// Outline sends ids as strings; older builds and some proxies send numbers.
fn key_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
