//! Execution of `HttpRequest` values.
//!
//! `Transport` is the seam between the I/O-free `ManagementApi` and the
//! network. `UreqTransport` is the blocking implementation used by default.
//! Non-2xx statuses are returned as data, never as `Err`, so the parsers see
//! every status code; `Err` means no complete response was obtained: the
//! request failed, or the body was truncated or exceeded
//! `ClientConfig::max_response_bytes`.

use tracing::debug;
use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    max_response_bytes: u64,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let tls = TlsConfig::builder()
            .disable_verification(config.skip_certificate_validation)
            .build();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(config.connect_timeout())
            .timeout_global(config.timeout())
            .tls_config(tls)
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let headers = &request.headers;
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&request.path), headers).call(),
            (HttpMethod::Delete, _) => {
                with_headers(self.agent.delete(&request.path), headers).call()
            }
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&request.path), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&request.path), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&request.path), headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(&request.path), headers).send_empty(),
        };

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!(method = %request.method, path = %request.path, error = %e, "request failed");
                return Err(e.into());
            }
        };

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_string()
            .inspect_err(|e| {
                debug!(method = %request.method, path = %request.path, status, error = %e, "reading body failed");
            })?;
        debug!(method = %request.method, path = %request.path, status, "management request");

        Ok(HttpResponse::new(status, body))
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
