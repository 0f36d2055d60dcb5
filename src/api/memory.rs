//! Memory CRUD handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::collections::HashSet;

use super::{with_store, AppState, JsonBody};
use crate::error::MemoryError;
use crate::memory::store::NewMemory;
use crate::memory::types::{Metadata, MetadataValue};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddRequest {
    content: Option<String>,
    container_tag: Option<String>,
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
    custom_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListRequest {
    container_tags: Option<Vec<String>>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GetParams {
    container_tag: Option<String>,
}

/// Convert request metadata, rejecting anything that is not a string, number or bool.
fn parse_metadata(
    raw: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<Metadata, MemoryError> {
    let mut metadata = Metadata::new();
    for (key, value) in raw.unwrap_or_default() {
        let value = MetadataValue::from_json(&value).ok_or_else(|| {
            MemoryError::validation(format!(
                "metadata value for {key} must be a string, number or boolean"
            ))
        })?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// POST /add
pub(super) async fn add_memory(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AddRequest>,
) -> Result<Json<serde_json::Value>, MemoryError> {
    let content = req
        .content
        .ok_or_else(|| MemoryError::validation("content is required"))?;
    let tag = state.tag_or_default(req.container_tag);
    let metadata = parse_metadata(req.metadata)?;

    let input = NewMemory {
        tag: tag.clone(),
        content,
        metadata,
        custom_id: req.custom_id,
    };
    let content_len = input.content.len();

    let id = with_store(&state, move |store| store.add(input)).await?;

    tracing::info!(id = %id, tag = %tag, content_len, "memory stored");
    Ok(Json(serde_json::json!({ "id": id, "status": "done" })))
}

/// POST /memories/list: newest first across the requested tags.
pub(super) async fn list_memories(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ListRequest>,
) -> Result<Json<serde_json::Value>, MemoryError> {
    let retrieval = &state.config.retrieval;
    let limit = req
        .limit
        .unwrap_or(retrieval.default_list_limit)
        .min(retrieval.max_list_limit);

    let mut tags: Vec<String> = req
        .container_tags
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        tags.push(state.config.storage.default_tag.clone());
    }
    let mut seen = HashSet::new();
    tags.retain(|t| seen.insert(t.clone()));

    let memories = with_store(&state, move |store| Ok(store.list_merged(&tags, limit))).await?;

    Ok(Json(serde_json::json!({ "memories": memories })))
}

/// GET /memories/{id}?containerTag=
pub(super) async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<GetParams>,
) -> Result<Json<serde_json::Value>, MemoryError> {
    let tag = state.tag_or_default(params.container_tag);
    let memory = with_store(&state, move |store| {
        store.get(&tag, &id).cloned().ok_or(MemoryError::NotFound)
    })
    .await?;
    Ok(Json(serde_json::json!({ "memory": memory })))
}

/// DELETE /memories/{id}
pub(super) async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, MemoryError> {
    let target = id.clone();
    with_store(&state, move |store| store.soft_delete(&target)).await?;
    tracing::info!(id = %id, "memory deleted");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_accepts_scalars() {
        let raw = serde_json::json!({"a": "x", "b": 2, "c": false});
        let meta = parse_metadata(raw.as_object().cloned()).unwrap();
        assert_eq!(meta.len(), 3);
        assert_eq!(meta["b"], MetadataValue::Number(2.0));
    }

    #[test]
    fn metadata_rejects_nested_values() {
        let raw = serde_json::json!({"a": {"nested": true}});
        let err = parse_metadata(raw.as_object().cloned()).unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn missing_metadata_is_empty() {
        assert!(parse_metadata(None).unwrap().is_empty());
    }
}
