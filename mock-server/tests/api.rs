use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, AccessKey, Db, ServerInfo};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn rename_request(uri: &str, name: &str) -> Request<String> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n--{boundary}--\r\n"
    );
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body)
        .unwrap()
}

// --- access keys ---

#[tokio::test]
async fn list_keys_empty() {
    let resp = app()
        .oneshot(empty_request("GET", "/access-keys/"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["accessKeys"], serde_json::json!([]));
}

#[tokio::test]
async fn create_key_returns_201() {
    let resp = app()
        .oneshot(empty_request("POST", "/access-keys/"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let key: AccessKey = body_json(resp).await;
    assert_eq!(key.id, "0");
    assert_eq!(key.port, 8388);
    assert!(key.data_limit.is_none());
}

#[tokio::test]
async fn delete_unknown_key_returns_404() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/access-keys/42"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_unknown_key_returns_404() {
    let resp = app()
        .oneshot(rename_request("/access-keys/42/name", "nobody"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_with_json_body_is_rejected() {
    let db = Db::default();
    db.write().await.create_key();
    let resp = app_with_state(db, "")
        .oneshot(json_request("PUT", "/access-keys/0/name", r#"{"name":"x"}"#))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// --- server ---

#[tokio::test]
async fn port_validation() {
    let db = Db::default();
    db.write().await.reserved_ports.insert(443);
    let app = app_with_state(db, "");

    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/server/port-for-new-access-keys", r#"{"port":0}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/server/port-for-new-access-keys", r#"{}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/server/port-for-new-access-keys", r#"{"port":443}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/server/port-for-new-access-keys", r#"{"port":8443}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(empty_request("GET", "/server")).await.unwrap();
    let info: ServerInfo = body_json(resp).await;
    assert_eq!(info.port_for_new_access_keys, 8443);
}

#[tokio::test]
async fn routes_mount_under_prefix() {
    let app = app_with_state(Db::default(), "/SecretPath");

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/SecretPath/server"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(empty_request("GET", "/server")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full key lifecycle ---

#[tokio::test]
async fn key_lifecycle() {
    use tower::Service;

    let db = Db::default();
    let mut app = app_with_state(db.clone(), "").into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("POST", "/access-keys/"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: AccessKey = body_json(resp).await;
    let id = created.id.clone();

    // rename
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rename_request(&format!("/access-keys/{id}/name"), "laptop"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // data limit
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/access-keys/{id}/data-limit"),
            r#"{"limit":{"bytes":1000}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // list reflects rename and limit
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/access-keys/"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["accessKeys"][0]["name"], "laptop");
    assert_eq!(body["accessKeys"][0]["dataLimit"]["bytes"], 1000);

    // metrics only list keys with usage
    db.write().await.transfer.insert(id.clone(), 77);
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/metrics/transfer"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["bytesTransferredByUserId"][&id], 77);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/access-keys/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // list after delete — empty
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/access-keys/"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["accessKeys"], serde_json::json!([]));
}
