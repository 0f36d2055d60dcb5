#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use memhost::api::{router, AppState};
use memhost::auth::AuthToken;
use memhost::config::MemhostConfig;
use memhost::memory::profile::RegexProfileExtractor;
use memhost::memory::store::MemoryStore;
use std::sync::Arc;
use tempfile::TempDir;

/// Config rooted in a fresh temp directory. Keep the `TempDir` alive for the test.
pub fn test_config() -> (TempDir, MemhostConfig) {
    let tmp = TempDir::new().unwrap();
    let mut config = MemhostConfig::default();
    config.storage.data_dir = tmp.path().to_string_lossy().into_owned();
    (tmp, config)
}

/// Router state backed by a snapshot in a temp directory, with a known token.
pub fn test_state_with(config: MemhostConfig) -> (AppState, String) {
    let store = MemoryStore::open(config.snapshot_path(), config.limits.clone()).unwrap();
    let token = AuthToken::generate();
    let secret = token.as_str().to_string();
    let extractor = Arc::new(RegexProfileExtractor::new(config.retrieval.profile_max_facts));
    (AppState::new(store, token, config, extractor), secret)
}

pub fn test_app() -> (TempDir, axum::Router, String) {
    let (tmp, config) = test_config();
    let (state, token) = test_state_with(config);
    (tmp, router(state), token)
}

pub async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn json_req(method: &str, uri: &str, body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    raw_req(method, uri, serde_json::to_vec(&body).unwrap(), token)
}

pub fn raw_req(method: &str, uri: &str, body: Vec<u8>, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = token {
        b = b.header("authorization", format!("Bearer {t}"));
    }
    b.body(Body::from(body)).unwrap()
}

pub fn empty_req(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        b = b.header("authorization", format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}
