//! Keyword relevance ranking over a single container tag.
//!
//! Scoring is a token containment ratio: the share of distinct query tokens that
//! appear in a document. It is not TF-IDF; every token weighs the same and document
//! length is ignored.
//!
//! Returned similarities are re-normalized against the best hit, so the top result
//! always reports `1.0`. The raw ratio travels alongside as `score` for callers that
//! need a value comparable across queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

use crate::memory::store::MemoryStore;
use crate::memory::types::{Metadata, MemoryRecord};

/// Hard ceiling on results per search, whatever the caller asks for.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Tokens shorter than this many characters are dropped.
pub const MIN_TOKEN_CHARS: usize = 3;

// ── Public types ──────────────────────────────────────────────────────────────

/// One ranked record.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a MemoryRecord,
    /// Score divided by the best score in the result set.
    pub similarity: f64,
    /// Raw containment ratio in `[0, 1]`.
    pub score: f64,
}

/// Wire shape of a single search result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub memory: String,
    pub title: Option<String>,
    pub metadata: Metadata,
    pub similarity: f64,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire shape of `/search/memories`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    /// Elapsed milliseconds.
    pub timing: u64,
}

impl From<SearchHit<'_>> for SearchResult {
    fn from(hit: SearchHit<'_>) -> Self {
        Self {
            id: hit.record.id.clone(),
            memory: hit.record.content.clone(),
            title: hit.record.title.clone(),
            metadata: hit.record.metadata.clone(),
            similarity: hit.similarity,
            score: hit.score,
            created_at: hit.record.created_at,
            updated_at: hit.record.updated_at,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Lowercase, strip punctuation, split on whitespace, drop short tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Fraction of distinct query tokens present in the document. `0.0` if either is empty.
pub fn score(query_tokens: &[String], doc_tokens: &[String]) -> f64 {
    if query_tokens.is_empty() || doc_tokens.is_empty() {
        return 0.0;
    }
    let doc: HashSet<&str> = doc_tokens.iter().map(String::as_str).collect();
    let query: HashSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let matched = query.iter().filter(|t| doc.contains(*t)).count();
    matched as f64 / query.len() as f64
}

/// Rank the live records of `tag` against `query`.
///
/// Zero-score records are dropped. Ties keep insertion order. `limit` is clamped to
/// `1..=MAX_SEARCH_LIMIT`.
pub fn search<'a>(store: &'a MemoryStore, tag: &str, query: &str, limit: usize) -> Vec<SearchHit<'a>> {
    let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&MemoryRecord, f64)> = store
        .records(tag)
        .map(|record| (record, score(&query_tokens, &tokenize(&record.content))))
        .filter(|(_, s)| *s > 0.0)
        .collect();

    // sort_by is stable, so equal scores stay in insertion order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);

    let top = scored.first().map(|(_, s)| *s).unwrap_or(0.0);
    scored
        .into_iter()
        .map(|(record, raw)| SearchHit {
            record,
            similarity: if top > 0.0 { raw / top } else { 0.0 },
            score: raw,
        })
        .collect()
}

/// Run [`search`] and package the result for the HTTP surface.
pub fn search_memories(store: &MemoryStore, tag: &str, query: &str, limit: usize) -> SearchResponse {
    let started = Instant::now();
    let results: Vec<SearchResult> = search(store, tag, query, limit)
        .into_iter()
        .map(SearchResult::from)
        .collect();
    let total = results.len();
    SearchResponse {
        results,
        total,
        timing: started.elapsed().as_millis() as u64,
    }
}
