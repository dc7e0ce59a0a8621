//! In-memory emulation of the Outline server management API.
//!
//! Serves the same endpoints and status codes as a real Outline server so
//! client tests can run over HTTP without a VPN deployment. State lives in a
//! shared `Db`; tests may reach into it to seed transfer metrics or reserve
//! ports.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_METHOD: &str = "chacha20-ietf-poly1305";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataLimit {
    pub bytes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_limit: Option<DataLimit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: u64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_data_limit: Option<DataLimit>,
    pub port_for_new_access_keys: u16,
    pub hostname_for_access_keys: String,
}

#[derive(Deserialize)]
pub struct SetDataLimit {
    pub limit: DataLimit,
}

/// Everything the emulated server knows.
#[derive(Debug)]
pub struct ServerState {
    pub info: ServerInfo,
    pub keys: BTreeMap<u64, AccessKey>,
    pub next_id: u64,
    /// Bytes per key id; keys without usage are absent, as on a real server.
    pub transfer: HashMap<String, u64>,
    /// Ports answered with 409 by the port endpoint.
    pub reserved_ports: HashSet<u16>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            info: ServerInfo {
                name: "Outline Server".to_string(),
                server_id: Uuid::new_v4().to_string(),
                metrics_enabled: false,
                created_timestamp_ms: 1_536_613_192_052,
                version: "1.0.0".to_string(),
                access_key_data_limit: None,
                port_for_new_access_keys: 8388,
                hostname_for_access_keys: "127.0.0.1".to_string(),
            },
            keys: BTreeMap::new(),
            next_id: 0,
            transfer: HashMap::new(),
            reserved_ports: HashSet::new(),
        }
    }
}

impl ServerState {
    fn access_url(&self, method: &str, password: &str, port: u16) -> String {
        format!(
            "ss://{method}:{password}@{}:{port}/?outline=1",
            self.info.hostname_for_access_keys
        )
    }

    pub fn create_key(&mut self) -> AccessKey {
        let id = self.next_id;
        self.next_id += 1;
        let password = Uuid::new_v4().simple().to_string();
        let port = self.info.port_for_new_access_keys;
        let key = AccessKey {
            id: id.to_string(),
            name: String::new(),
            access_url: self.access_url(DEFAULT_METHOD, &password, port),
            password,
            port,
            method: DEFAULT_METHOD.to_string(),
            data_limit: None,
        };
        self.keys.insert(id, key.clone());
        key
    }

    fn key_mut(&mut self, id: &str) -> Option<&mut AccessKey> {
        let id: u64 = id.parse().ok()?;
        self.keys.get_mut(&id)
    }
}

pub type Db = Arc<RwLock<ServerState>>;

pub fn app() -> Router {
    app_with_state(Db::default(), "")
}

/// Router over `db`, mounted under `prefix` (the secret path of a real
/// server) when it is not empty.
pub fn app_with_state(db: Db, prefix: &str) -> Router {
    let routes = Router::new()
        .route("/access-keys", get(list_keys).post(create_key))
        .route("/access-keys/", get(list_keys).post(create_key))
        .route("/access-keys/{id}", axum::routing::delete(delete_key))
        .route("/access-keys/{id}/name", put(rename_key))
        .route(
            "/access-keys/{id}/data-limit",
            put(set_key_data_limit).delete(delete_key_data_limit),
        )
        .route("/metrics/transfer", get(transfer_metrics))
        .route("/metrics/enabled", get(metrics_enabled).put(set_metrics_enabled))
        .route("/server", get(server_info))
        .route("/name", put(set_server_name))
        .route("/server/hostname-for-access-keys", put(set_hostname))
        .route("/server/port-for-new-access-keys", put(set_port_for_new_keys))
        .route(
            "/server/access-key-data-limit",
            put(set_global_data_limit).delete(delete_global_data_limit),
        )
        .with_state(db);

    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    }
}

pub async fn run(listener: TcpListener, db: Db, prefix: &str) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, prefix, "mock management api listening");
    }
    axum::serve(listener, app_with_state(db, prefix)).await
}

async fn list_keys(State(db): State<Db>) -> Json<Value> {
    let state = db.read().await;
    let keys: Vec<&AccessKey> = state.keys.values().collect();
    Json(serde_json::json!({ "accessKeys": keys }))
}

async fn create_key(State(db): State<Db>) -> (StatusCode, Json<AccessKey>) {
    let key = db.write().await.create_key();
    (StatusCode::CREATED, Json(key))
}

async fn delete_key(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    let mut state = db.write().await;
    let removed = id.parse::<u64>().ok().and_then(|n| state.keys.remove(&n));
    match removed {
        Some(_) => {
            state.transfer.remove(&id);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn rename_key(
    State(db): State<Db>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("name") {
            name = field.text().await.ok();
        }
    }
    let Some(name) = name else {
        return StatusCode::BAD_REQUEST;
    };

    match db.write().await.key_mut(&id) {
        Some(key) => {
            key.name = name;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn set_key_data_limit(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<SetDataLimit>,
) -> StatusCode {
    match db.write().await.key_mut(&id) {
        Some(key) => {
            key.data_limit = Some(input.limit);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn delete_key_data_limit(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    match db.write().await.key_mut(&id) {
        Some(key) => {
            key.data_limit = None;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn transfer_metrics(State(db): State<Db>) -> Json<Value> {
    let state = db.read().await;
    Json(serde_json::json!({ "bytesTransferredByUserId": state.transfer }))
}

async fn metrics_enabled(State(db): State<Db>) -> Json<Value> {
    let state = db.read().await;
    Json(serde_json::json!({ "metricsEnabled": state.info.metrics_enabled }))
}

async fn set_metrics_enabled(State(db): State<Db>, Json(input): Json<Value>) -> StatusCode {
    let Some(enabled) = input.get("metricsEnabled").and_then(Value::as_bool) else {
        return StatusCode::BAD_REQUEST;
    };
    db.write().await.info.metrics_enabled = enabled;
    StatusCode::NO_CONTENT
}

async fn server_info(State(db): State<Db>) -> Json<ServerInfo> {
    Json(db.read().await.info.clone())
}

async fn set_server_name(State(db): State<Db>, Json(input): Json<Value>) -> StatusCode {
    let Some(name) = input.get("name").and_then(Value::as_str) else {
        return StatusCode::BAD_REQUEST;
    };
    db.write().await.info.name = name.to_string();
    StatusCode::NO_CONTENT
}

async fn set_hostname(State(db): State<Db>, Json(input): Json<Value>) -> StatusCode {
    let hostname = input.get("hostname").and_then(Value::as_str).unwrap_or("");
    if hostname.is_empty() || hostname.contains(char::is_whitespace) {
        return StatusCode::BAD_REQUEST;
    }
    let mut state = db.write().await;
    state.info.hostname_for_access_keys = hostname.to_string();
    let rebuilt: Vec<(u64, String)> = state
        .keys
        .iter()
        .map(|(id, k)| (*id, state.access_url(&k.method, &k.password, k.port)))
        .collect();
    for (id, url) in rebuilt {
        if let Some(key) = state.keys.get_mut(&id) {
            key.access_url = url;
        }
    }
    StatusCode::NO_CONTENT
}

async fn set_port_for_new_keys(State(db): State<Db>, Json(input): Json<Value>) -> StatusCode {
    let port = input
        .get("port")
        .and_then(Value::as_u64)
        .filter(|p| (1..=65535).contains(p))
        .and_then(|p| u16::try_from(p).ok());
    let Some(port) = port else {
        return StatusCode::BAD_REQUEST;
    };

    let mut state = db.write().await;
    if state.reserved_ports.contains(&port) {
        return StatusCode::CONFLICT;
    }
    state.info.port_for_new_access_keys = port;
    StatusCode::NO_CONTENT
}

async fn set_global_data_limit(State(db): State<Db>, Json(input): Json<SetDataLimit>) -> StatusCode {
    db.write().await.info.access_key_data_limit = Some(input.limit);
    StatusCode::NO_CONTENT
}

async fn delete_global_data_limit(State(db): State<Db>) -> StatusCode {
    db.write().await.info.access_key_data_limit = None;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_key_serializes_camel_case() {
        let key = AccessKey {
            id: "0".to_string(),
            name: "a".to_string(),
            password: "p".to_string(),
            port: 8388,
            method: DEFAULT_METHOD.to_string(),
            access_url: "ss://x".to_string(),
            data_limit: None,
        };
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["accessUrl"], "ss://x");
        assert!(json.get("dataLimit").is_none());
    }

    #[test]
    fn created_keys_get_sequential_string_ids() {
        let mut state = ServerState::default();
        let first = state.create_key();
        let second = state.create_key();
        assert_eq!(first.id, "0");
        assert_eq!(second.id, "1");
        assert_eq!(first.port, state.info.port_for_new_access_keys);
        assert!(first.access_url.starts_with("ss://"));
    }

    #[test]
    fn key_mut_rejects_non_numeric_ids() {
        let mut state = ServerState::default();
        state.create_key();
        assert!(state.key_mut("0").is_some());
        assert!(state.key_mut("zero").is_none());
    }

    #[test]
    fn set_data_limit_requires_bytes() {
        let result: Result<SetDataLimit, _> = serde_json::from_str(r#"{"limit":{}}"#);
        assert!(result.is_err());
    }
}
