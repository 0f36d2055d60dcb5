//! HTTP surface.
//!
//! Every route is served both at the root and under `/v1`. Layers, outermost first:
//! CORS (answers preflights), panic catcher, request tracing, body limit, then bearer
//! auth, which guards everything except `/health`, including unmatched paths.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthToken};
use crate::config::MemhostConfig;
use crate::error::MemoryError;
use crate::memory::profile::ProfileExtractor;
use crate::memory::store::MemoryStore;

mod memory;
mod search;

use memory::*;
use search::*;

/// Shared handler state. The store sits behind one mutex, which makes it the single
/// writer: every read or mutation holds the lock for its whole duration.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<MemoryStore>>,
    pub token: Arc<AuthToken>,
    pub config: Arc<MemhostConfig>,
    pub extractor: Arc<dyn ProfileExtractor>,
}

impl AppState {
    pub fn new(
        store: MemoryStore,
        token: AuthToken,
        config: MemhostConfig,
        extractor: Arc<dyn ProfileExtractor>,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            token: Arc::new(token),
            config: Arc::new(config),
            extractor,
        }
    }

    /// Container tag to use when the request names none.
    pub(crate) fn tag_or_default(&self, tag: Option<String>) -> String {
        tag.filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.config.storage.default_tag.clone())
    }
}

/// Run `f` against the locked store on the blocking pool; flushes hit the disk.
pub(crate) async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, MemoryError>
where
    F: FnOnce(&mut MemoryStore) -> Result<T, MemoryError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || {
        // A panicked request poisons the mutex; keep serving from the recovered store.
        let mut guard = store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("store lock was poisoned by a panicked request, recovering");
            poisoned.into_inner()
        });
        f(&mut guard)
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            tracing::error!(error = %e, "store task panicked");
        } else {
            tracing::error!(error = %e, "store task cancelled");
        }
        MemoryError::Internal("Internal server error".into())
    })?
}

/// JSON body extractor whose failures use the `{error}` envelope.
///
/// An empty body reads as `{}` so missing fields surface as validation errors.
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MemoryError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                MemoryError::PayloadTooLarge
            } else {
                MemoryError::MalformedInput(rejection.body_text())
            }
        })?;

        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(body)
            .map(JsonBody)
            .map_err(|e| MemoryError::MalformedInput(e.to_string()))
    }
}

/// Bearer check for every non-public path. Bare `OPTIONS` requests are answered here.
async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, MemoryError> {
    if req.method() == Method::OPTIONS {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    if auth::is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let authorized = auth::bearer_token(req.headers())
        .map(|presented| state.token.verify(presented))
        .unwrap_or(false);

    if authorized {
        Ok(next.run(req).await)
    } else {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "rejected request without valid bearer token"
        );
        Err(MemoryError::Unauthorized)
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/add", post(add_memory))
        .route("/profile", post(profile))
        .route("/search/memories", post(search_memories))
        .route("/memories/list", post(list_memories))
        .route("/memories/{id}", get(get_memory).delete(delete_memory))
}

pub fn router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;

    Router::new()
        .merge(routes())
        .nest("/v1", routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(auth::cors_layer())
        .with_state(state)
}

async fn not_found() -> MemoryError {
    MemoryError::RouteNotFound
}

/// Panics become a 500 with a generic message; the payload goes to the local log only.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");
    MemoryError::Internal("Internal server error".into()).into_response()
}

/// GET /health: liveness plus the live record count. No auth.
async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, MemoryError> {
    let memories = with_store(&state, |store| Ok(store.active_count())).await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": "local",
        "memories": memories,
    })))
}
