//! In-process HTTP peer for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use dash::{Configuration, Scenario};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub const SOAP_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <GetPriceResponse>
      <Price currency="EUR">12.50</Price>
      <Item>apple</Item>
    </GetPriceResponse>
  </soap:Body>
</soap:Envelope>"#;

pub struct MockServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });
        Self { addr, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/users/{id}", get(user))
        .route("/gzip", get(gzipped))
        .route("/soap", any(soap))
        .route("/token", any(token))
}

/// Echoes the request back as `{method, path, query, headers, body}`
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query().unwrap_or_default(),
        "headers": headers,
        "body": body,
    }))
}

async fn status(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({"status": code}))).into_response()
}

async fn user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"data": {"id": id, "name": "alice", "roles": ["admin", "editor"], "age": 30}}))
}

async fn gzipped() -> Response {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json!({"data": {"compressed": "yes"}}).to_string().as_bytes())
        .unwrap();
    let body = encoder.finish().unwrap();

    (
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        body,
    )
        .into_response()
}

async fn soap() -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], SOAP_RESPONSE).into_response()
}

async fn token(headers: HeaderMap) -> Response {
    match headers.get("x-client") {
        Some(_) => Json(json!({"data": {"token": "secret-token"}})).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({"error": "missing client"}))).into_response(),
    }
}

pub fn config() -> Configuration {
    Configuration::from_yaml_str(
        r#"
services:
  - name: users
    developer: dev
    tester: qa
    headers:
      X-Service: users
      X-Layer: service
data:
  user_id: "42"
  name: alice
headers:
  X-Layer: global
  Accept: application/json
metadata:
  project: shop
  environment: test
  collection: smoke
  domain: retail
maskedfields:
  Authorization: "***"
"#,
    )
    .unwrap()
}

pub fn scenario(name: &str, url: String) -> Scenario {
    Scenario {
        name: name.to_string(),
        service: "users".to_string(),
        method: "GET".to_string(),
        status: 200,
        url,
        ..Scenario::default()
    }
}
