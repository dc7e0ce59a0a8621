//! Stateless request builder and response parser for the management API.
//!
//! # Design
//! `ManagementApi` holds only a `base_url`. Each endpoint has a `build_*`
//! method producing an `HttpRequest` and, where the response carries meaning
//! beyond "was it 204", a `parse_*` method consuming the `HttpResponse`.
//! Nothing here performs I/O; `OutlineVpn` pairs these with a `Transport`.
//!
//! Parsers encode the management API's error asymmetry: data-returning
//! endpoints and the port endpoint fail with `Error::Server`, toggles are
//! reduced to a bool by `is_success`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{
    Error, Result, INVALID_PORT, PORT_IN_USE, UNABLE_TO_CREATE_KEY, UNABLE_TO_GET_METRICS,
    UNABLE_TO_GET_SERVER_INFO, UNABLE_TO_RETRIEVE_KEYS,
};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON};
use crate::types::{
    AccessKey, DataLimit, KeyList, MetricsEnabled, ServerInfo, SetDataLimit, SetHostname,
    SetPort, SetServerName, TransferMetrics,
};

/// Status every mutating endpoint answers with on success.
pub const NO_CONTENT: u16 = 204;

/// Synchronous, stateless request builder for one management API base URL.
#[derive(Debug, Clone)]
pub struct ManagementApi {
    base_url: String,
}

impl ManagementApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    fn json<T: Serialize>(&self, method: HttpMethod, endpoint: &str, body: &T) -> Result<HttpRequest> {
        let body = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(HttpRequest::new(method, self.url(endpoint)).with_body(APPLICATION_JSON, body))
    }

    // --- access keys ---

    pub fn build_list_keys(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("access-keys/"))
    }

    pub fn build_create_key(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, self.url("access-keys/"))
    }

    pub fn build_delete_key(&self, key_id: &str) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.url(&format!("access-keys/{key_id}")))
    }

    /// The management API reads the new name from a multipart form field,
    /// not from JSON.
    pub fn build_rename_key(&self, key_id: &str, name: &str) -> HttpRequest {
        let boundary = Uuid::new_v4().simple().to_string();
        let content_type = format!("multipart/form-data; boundary={boundary}");
        HttpRequest::new(HttpMethod::Put, self.url(&format!("access-keys/{key_id}/name")))
            .with_body(&content_type, form_field(&boundary, "name", name))
    }

    pub fn build_add_data_limit(&self, key_id: &str, limit_bytes: u64) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            &format!("access-keys/{key_id}/data-limit"),
            &SetDataLimit {
                limit: DataLimit { bytes: limit_bytes },
            },
        )
    }

    pub fn build_delete_data_limit(&self, key_id: &str) -> HttpRequest {
        HttpRequest::new(
            HttpMethod::Delete,
            self.url(&format!("access-keys/{key_id}/data-limit")),
        )
    }

    // --- metrics ---

    pub fn build_transfer_metrics(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("metrics/transfer"))
    }

    pub fn build_metrics_status(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("metrics/enabled"))
    }

    pub fn build_set_metrics_status(&self, enabled: bool) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            "metrics/enabled",
            &MetricsEnabled {
                metrics_enabled: enabled,
            },
        )
    }

    // --- server ---

    pub fn build_server_info(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, self.url("server"))
    }

    pub fn build_set_server_name(&self, name: &str) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            "name",
            &SetServerName {
                name: name.to_string(),
            },
        )
    }

    pub fn build_set_hostname(&self, hostname: &str) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            "server/hostname-for-access-keys",
            &SetHostname {
                hostname: hostname.to_string(),
            },
        )
    }

    pub fn build_set_port_for_new_access_keys(&self, port: u16) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            "server/port-for-new-access-keys",
            &SetPort { port },
        )
    }

    pub fn build_set_data_limit_for_all_keys(&self, limit_bytes: u64) -> Result<HttpRequest> {
        self.json(
            HttpMethod::Put,
            "server/access-key-data-limit",
            &SetDataLimit {
                limit: DataLimit { bytes: limit_bytes },
            },
        )
    }

    pub fn build_delete_data_limit_for_all_keys(&self) -> HttpRequest {
        HttpRequest::new(HttpMethod::Delete, self.url("server/access-key-data-limit"))
    }

    // --- parsers ---

    pub fn parse_list_keys(&self, response: &HttpResponse) -> Result<Vec<AccessKey>> {
        if response.status != 200 {
            return Err(Error::server(UNABLE_TO_RETRIEVE_KEYS));
        }
        let list: KeyList = decode(response).map_err(|_| Error::server(UNABLE_TO_RETRIEVE_KEYS))?;
        Ok(list.access_keys)
    }

    pub fn parse_transfer_metrics(&self, response: &HttpResponse) -> Result<TransferMetrics> {
        if response.status >= 400 {
            return Err(Error::server(UNABLE_TO_GET_METRICS));
        }
        decode(response).map_err(|_| Error::server(UNABLE_TO_GET_METRICS))
    }

    pub fn parse_create_key(&self, response: &HttpResponse) -> Result<AccessKey> {
        if response.status != 201 {
            return Err(Error::server(UNABLE_TO_CREATE_KEY));
        }
        decode(response).map_err(|_| Error::server(UNABLE_TO_CREATE_KEY))
    }

    pub fn parse_server_info(&self, response: &HttpResponse) -> Result<ServerInfo> {
        if response.status != 200 {
            return Err(Error::server(UNABLE_TO_GET_SERVER_INFO));
        }
        decode(response).map_err(|_| Error::server(UNABLE_TO_GET_SERVER_INFO))
    }

    /// The status code is not inspected; only the body decides.
    pub fn parse_metrics_status(&self, response: &HttpResponse) -> Result<bool> {
        let status: MetricsEnabled = decode(response)?;
        Ok(status.metrics_enabled)
    }

    pub fn parse_set_port_for_new_access_keys(&self, response: &HttpResponse) -> Result<bool> {
        match response.status {
            400 => Err(Error::server(INVALID_PORT)),
            409 => Err(Error::server(PORT_IN_USE)),
            status => Ok(status == NO_CONTENT),
        }
    }

    /// Outcome of a toggle endpoint: any status but 204 is a plain `false`.
    pub fn is_success(&self, response: &HttpResponse) -> bool {
        response.status == NO_CONTENT
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
}

fn form_field(boundary: &str, name: &str, value: &str) -> String {
    format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n--{boundary}--\r\n"
    )
}
