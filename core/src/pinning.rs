//! One-shot certificate fingerprint pinning.
//!
//! Outline management endpoints use a self-signed certificate whose SHA-256
//! fingerprint is handed out together with the API URL. Before a client is
//! returned, `check_fingerprint` opens a single TLS connection to the API
//! host, hashes the DER encoding of the presented leaf certificate and
//! compares it against the expected value.
//!
//! The handshake accepts any certificate: trust comes from the fingerprint
//! comparison, not from a CA chain.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig as TlsClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use ureq::http::Uri;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Uppercase hex SHA-256 of a DER certificate, the notation Outline prints.
pub fn cert_fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect()
}

/// Strips separators and whitespace and uppercases, so `ab:cd` equals `ABCD`.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Connects to the host of `api_url` and fails with
/// `Error::CertificateMismatch` unless its certificate hashes to `expected`.
///
/// The connect and per-operation timeouts of `config` bound the handshake; a
/// peer that accepts the connection and then stays silent fails with
/// `Error::Certificate` once the I/O timeout elapses.
pub fn check_fingerprint(api_url: &str, expected: &str, config: &ClientConfig) -> Result<()> {
    let (host, port) = host_and_port(api_url)?;
    let der = fetch_peer_certificate(&host, port, config.connect_timeout(), config.io_timeout())?;
    let actual = cert_fingerprint(&der);

    if normalize_fingerprint(expected) != actual {
        warn!(%host, port, %actual, "certificate fingerprint mismatch");
        return Err(Error::CertificateMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    info!(%host, port, "certificate fingerprint verified");
    Ok(())
}

fn host_and_port(api_url: &str) -> Result<(String, u16)> {
    let uri: Uri = api_url
        .parse()
        .map_err(|e| Error::InvalidUrl(format!("{api_url}: {e}")))?;
    let host = uri
        .host()
        .ok_or_else(|| Error::InvalidUrl(format!("{api_url}: missing host")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = match uri.port_u16() {
        Some(port) => port,
        None if uri.scheme_str() == Some("http") => 80,
        None => 443,
    };
    Ok((host, port))
}

fn fetch_peer_certificate(
    host: &str,
    port: u16,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let provider = Arc::new(ring::default_provider());
    let config = TlsClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| Error::InvalidUrl(format!("{host}: {e}")))?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)?;
    let mut sock = connect(host, port, connect_timeout)?;
    let io_err = |e: std::io::Error| Error::Certificate(format!("{host}:{port}: {e}"));
    sock.set_read_timeout(io_timeout).map_err(io_err)?;
    sock.set_write_timeout(io_timeout).map_err(io_err)?;

    while conn.peer_certificates().is_none() && conn.is_handshaking() {
        conn.complete_io(&mut sock).map_err(io_err)?;
    }

    conn.peer_certificates()
        .and_then(|chain| chain.first())
        .map(|cert| cert.as_ref().to_vec())
        .ok_or_else(|| Error::Certificate(format!("{host}:{port}: no certificate presented")))
}

fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream> {
    let io_err = |e: std::io::Error| Error::Certificate(format!("{host}:{port}: {e}"));
    let Some(timeout) = timeout else {
        return TcpStream::connect((host, port)).map_err(io_err);
    };

    let addrs = std::net::ToSocketAddrs::to_socket_addrs(&(host, port)).map_err(io_err)?;
    let mut last = std::io::Error::new(ErrorKind::NotFound, "no addresses resolved");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(sock) => return Ok(sock),
            Err(e) => last = e,
        }
    }
    Err(io_err(last))
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
