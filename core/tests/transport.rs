//! Response bodies over raw HTTP/1.1.
//!
//! A bare `TcpListener` answers each request with a canned body so the body
//! size and framing can be controlled byte for byte.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use outline_core::{ClientConfig, Error, HttpResponse, ManagementApi, OutlineVpn, Transport, UreqTransport};
use serde_json::json;

/// What the server writes for one request path.
#[derive(Clone)]
struct Reply {
    path: &'static str,
    body: String,
    /// Advertised `Content-Length`; `None` uses the real body length.
    declared_len: Option<usize>,
}

fn reply(path: &'static str, body: String) -> Reply {
    Reply {
        path,
        body,
        declared_len: None,
    }
}

/// Serves `connections` requests, one per connection, routed by path suffix.
fn start_raw_server(connections: usize, replies: Vec<Reply>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for _ in 0..connections {
            let Ok((sock, _)) = listener.accept() else {
                return;
            };
            serve_one(sock, &replies);
        }
    });
    addr
}

fn serve_one(mut sock: TcpStream, replies: &[Reply]) {
    let mut reader = BufReader::new(sock.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or_default();
    let Some(reply) = replies.iter().find(|r| path.ends_with(r.path)) else {
        let _ = sock.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };
    let declared = reply.declared_len.unwrap_or(reply.body.len());
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
    );
    let _ = sock.write_all(head.as_bytes());
    let _ = sock.write_all(reply.body.as_bytes());
    let _ = sock.flush();
}

fn key_list(count: usize) -> String {
    let padding = "x".repeat(200);
    let keys: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": i.to_string(),
                "name": format!("key-{i}-{padding}"),
                "password": "secret",
                "port": 8388,
                "method": "chacha20-ietf-poly1305",
                "accessUrl": format!("ss://secret@vpn.example:8388/?outline=1#{i}"),
            })
        })
        .collect();
    json!({ "accessKeys": keys }).to_string()
}

fn empty_metrics() -> String {
    json!({ "bytesTransferredByUserId": {} }).to_string()
}

#[test]
fn key_list_larger_than_ten_megabytes_is_read() {
    let body = key_list(50_000);
    assert!(body.len() > 11 * 1024 * 1024);
    let addr = start_raw_server(
        2,
        vec![reply("/access-keys/", body), reply("/metrics/transfer", empty_metrics())],
    );

    let config = ClientConfig::default().with_connect_timeout(5).with_timeout(30);
    let vpn = OutlineVpn::with_config(&format!("http://{addr}/SecretPath"), None, &config).unwrap();
    let keys = vpn.get_keys().unwrap();
    assert_eq!(keys.len(), 50_000);
    assert_eq!(keys[49_999].key_id, "49999");
    assert_eq!(keys[0].used_bytes, None);
}

#[test]
fn body_over_the_configured_limit_is_a_transport_error() {
    let addr = start_raw_server(1, vec![reply("/access-keys/", key_list(20))]);

    let config = ClientConfig::default().with_timeout(10).with_max_response_bytes(1024);
    let vpn = OutlineVpn::with_config(&format!("http://{addr}/SecretPath"), None, &config).unwrap();
    let err = vpn.get_keys().unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[test]
fn truncated_body_is_a_transport_error() {
    let body = key_list(3);
    let addr = start_raw_server(
        1,
        vec![Reply {
            path: "/access-keys/",
            declared_len: Some(body.len() + 4096),
            body,
        }],
    );

    let transport = UreqTransport::new(&ClientConfig::default().with_timeout(10));
    let request = ManagementApi::new(&format!("http://{addr}/SecretPath")).build_list_keys();
    let result: Result<HttpResponse, Error> = transport.execute(&request);
    assert!(matches!(result, Err(Error::Transport(_))), "got {result:?}");
}

