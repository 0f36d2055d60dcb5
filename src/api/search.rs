//! Ranked search and profile handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{with_store, AppState, JsonBody};
use crate::error::MemoryError;
use crate::memory::profile::{extract_profile, Profile};
use crate::memory::search::{self as ranking, SearchResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchRequest {
    q: Option<String>,
    container_tag: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProfileRequest {
    container_tag: Option<String>,
    q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ProfileResponse {
    profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_results: Option<SearchResponse>,
}

/// POST /search/memories
pub(super) async fn search_memories(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SearchRequest>,
) -> Result<Json<SearchResponse>, MemoryError> {
    let query = req
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| MemoryError::validation("q is required"))?;
    let tag = state.tag_or_default(req.container_tag);
    let limit = req
        .limit
        .unwrap_or(state.config.retrieval.default_search_limit);

    let response = with_store(&state, move |store| {
        Ok(ranking::search_memories(store, &tag, &query, limit))
    })
    .await?;

    tracing::debug!(
        total = response.total,
        timing_ms = response.timing,
        "search completed"
    );
    Ok(Json(response))
}

/// POST /profile: static/dynamic facts, plus search results when `q` is given.
pub(super) async fn profile(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ProfileRequest>,
) -> Result<Json<ProfileResponse>, MemoryError> {
    let tag = req
        .container_tag
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MemoryError::validation("containerTag is required"))?;
    let query = req.q.filter(|q| !q.trim().is_empty());

    let extractor = Arc::clone(&state.extractor);
    let window = state.config.retrieval.profile_window;
    let limit = state.config.retrieval.default_search_limit;

    let response = with_store(&state, move |store| {
        let profile = extract_profile(store, &tag, extractor.as_ref(), window);
        let search_results = query
            .as_deref()
            .map(|q| ranking::search_memories(store, &tag, q, limit));
        Ok(ProfileResponse {
            profile,
            search_results,
        })
    })
    .await?;

    Ok(Json(response))
}
