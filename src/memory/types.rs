//! Core memory type definitions.
//!
//! Defines [`MemoryRecord`] (a stored memory), [`MetadataValue`] (the scalar values
//! metadata may hold) and [`Snapshot`] (the on-disk shape of the whole store).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of characters kept from the first line when deriving a title.
pub const TITLE_MAX_CHARS: usize = 100;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A single metadata value. Only scalars are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl MetadataValue {
    /// Convert an arbitrary JSON value, rejecting null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Byte length counted against the metadata value limit.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::String(s) => s.len(),
            Self::Bool(_) | Self::Number(_) => 0,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Metadata attached to a record, ordered by key for stable snapshots.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A memory record as persisted in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Caller-supplied custom id or a generated UUID v7. Unique within its tag.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// First line of the content, truncated. `None` when the first line is blank.
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag. Deleted records stay in the snapshot forever.
    #[serde(default)]
    pub deleted: bool,
}

impl MemoryRecord {
    pub fn new(id: String, content: String, metadata: Metadata, now: DateTime<Utc>) -> Self {
        let title = derive_title(&content);
        Self {
            id,
            content,
            title,
            metadata,
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }
}

/// First line of `content`, trimmed and cut to [`TITLE_MAX_CHARS`] characters.
pub fn derive_title(content: &str) -> Option<String> {
    let first = content.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        return None;
    }
    Some(first.chars().take(TITLE_MAX_CHARS).collect())
}

/// The on-disk representation of every container tag's records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "snapshot_version")]
    pub version: u32,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<MemoryRecord>>,
}

fn snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}
