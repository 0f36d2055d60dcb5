//! The persistent store: every container tag's records, held in memory and mirrored
//! to a single JSON snapshot.
//!
//! [`MemoryStore`] loads the whole snapshot at startup and rewrites it after every
//! mutation through [`crate::util::write_private_atomic`], so the file on disk is always
//! a complete copy of the store. A mutation whose flush fails is rolled back in memory
//! before the error is returned.
//!
//! The store itself is not synchronized. Callers that share it across threads wrap it
//! in a single `Mutex` and hold the lock for the whole operation.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::LimitsConfig;
use crate::error::MemoryError;
use crate::memory::types::{Metadata, MemoryRecord, Snapshot, SNAPSHOT_VERSION};
use crate::util::write_private_atomic;

/// Input for [`MemoryStore::add`].
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub tag: String,
    pub content: String,
    pub metadata: Metadata,
    /// Caller-chosen id. A UUID v7 is generated when absent.
    pub custom_id: Option<String>,
}

impl NewMemory {
    pub fn new(tag: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content: content.into(),
            metadata: Metadata::new(),
            custom_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.custom_id = Some(id.into());
        self
    }
}

/// Record counts for a single container tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagStats {
    pub active: usize,
    pub deleted: usize,
}

/// Whole-store counts, used by `/health` and the CLI.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub active: usize,
    pub deleted: usize,
    pub by_tag: BTreeMap<String, TagStats>,
}

/// Borrowed view used to serialize without cloning every record.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    tags: &'a BTreeMap<String, Vec<MemoryRecord>>,
}

pub struct MemoryStore {
    /// Snapshot location. `None` keeps the store purely in memory.
    path: Option<PathBuf>,
    tags: BTreeMap<String, Vec<MemoryRecord>>,
    limits: LimitsConfig,
}

impl MemoryStore {
    /// Open the store backed by `path`, loading the snapshot if one exists.
    ///
    /// An unparseable snapshot does not fail startup: it is moved aside to
    /// `<file>.corrupt-<unix-seconds>` and the store starts empty. Other I/O errors
    /// (permissions, unreadable directory) are returned.
    pub fn open(path: impl AsRef<Path>, limits: LimitsConfig) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();

        let tags = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
                Ok(snapshot) => {
                    tracing::info!(
                        path = %path.display(),
                        tags = snapshot.tags.len(),
                        "snapshot loaded"
                    );
                    snapshot.tags
                }
                Err(e) => {
                    let quarantined = quarantine(&path)?;
                    tracing::error!(
                        path = %path.display(),
                        moved_to = %quarantined.display(),
                        error = %e,
                        "snapshot is unreadable, starting with an empty store; restore from backup if needed"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no snapshot yet, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            tags,
            limits,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(limits: LimitsConfig) -> Self {
        Self {
            path: None,
            tags: BTreeMap::new(),
            limits,
        }
    }

    /// Build an in-memory store from an already parsed snapshot.
    pub fn from_snapshot(snapshot: Snapshot, limits: LimitsConfig) -> Self {
        Self {
            path: None,
            tags: snapshot.tags,
            limits,
        }
    }

    /// Strictly parse the snapshot at `path` without side effects.
    pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, MemoryError> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Append a new record to `input.tag` and flush. Returns the record id.
    pub fn add(&mut self, input: NewMemory) -> Result<String, MemoryError> {
        self.validate(&input)?;

        let NewMemory {
            tag,
            content,
            metadata,
            custom_id,
        } = input;

        // Ids are unique within a tag, deleted records included.
        let id = match custom_id {
            Some(id) => {
                if self.contains_id(&tag, &id) {
                    return Err(MemoryError::validation(format!(
                        "id {id} already exists in container {tag}"
                    )));
                }
                id
            }
            None => loop {
                let id = uuid::Uuid::now_v7().to_string();
                if !self.contains_id(&tag, &id) {
                    break id;
                }
            },
        };

        self.tags
            .entry(tag.clone())
            .or_default()
            .push(MemoryRecord::new(id.clone(), content, metadata, Utc::now()));

        if let Err(e) = self.flush() {
            self.rollback_append(&tag);
            return Err(e);
        }

        tracing::debug!(id = %id, tag = %tag, "memory added");
        Ok(id)
    }

    /// The most recent `limit` live records of `tag`, newest first.
    pub fn list(&self, tag: &str, limit: usize) -> Vec<MemoryRecord> {
        self.recent(tag).take(limit).cloned().collect()
    }

    /// The most recent `limit` live records across `tags`, newest first.
    ///
    /// Each tag keeps its own append order; tags are interleaved by `created_at`, and
    /// an equal timestamp goes to the tag listed first.
    pub fn list_merged(&self, tags: &[String], limit: usize) -> Vec<MemoryRecord> {
        if let [tag] = tags {
            return self.list(tag, limit);
        }

        let mut heads: Vec<_> = tags.iter().map(|tag| self.recent(tag).peekable()).collect();
        let mut merged = Vec::with_capacity(limit.min(64));
        while merged.len() < limit {
            let mut newest: Option<(usize, &MemoryRecord)> = None;
            for (i, head) in heads.iter_mut().enumerate() {
                if let Some(&record) = head.peek() {
                    if newest.map_or(true, |(_, best)| record.created_at > best.created_at) {
                        newest = Some((i, record));
                    }
                }
            }
            let Some((i, record)) = newest else {
                break;
            };
            heads[i].next();
            merged.push(record.clone());
        }
        merged
    }

    /// Look up a live record by id within `tag`.
    pub fn get(&self, tag: &str, id: &str) -> Option<&MemoryRecord> {
        self.tags
            .get(tag)?
            .iter()
            .find(|r| r.id == id && !r.deleted)
    }

    /// Mark the live record with `id` as deleted, whichever tag holds it, and flush.
    pub fn soft_delete(&mut self, id: &str) -> Result<(), MemoryError> {
        let (tag, idx) = self
            .tags
            .iter()
            .find_map(|(tag, records)| {
                records
                    .iter()
                    .position(|r| r.id == id && !r.deleted)
                    .map(|idx| (tag.clone(), idx))
            })
            .ok_or(MemoryError::NotFound)?;

        let previous_updated = {
            let record = &mut self.tags.get_mut(&tag).ok_or(MemoryError::NotFound)?[idx];
            let prev = record.updated_at;
            record.deleted = true;
            record.updated_at = Utc::now().max(record.created_at);
            prev
        };

        if let Err(e) = self.flush() {
            if let Some(record) = self.tags.get_mut(&tag).and_then(|r| r.get_mut(idx)) {
                record.deleted = false;
                record.updated_at = previous_updated;
            }
            return Err(e);
        }

        tracing::debug!(id = %id, tag = %tag, "memory soft-deleted");
        Ok(())
    }

    /// Live records of `tag` in insertion order.
    pub fn records<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a MemoryRecord> + 'a {
        self.tags
            .get(tag)
            .into_iter()
            .flat_map(|records| records.iter())
            .filter(|r| !r.deleted)
    }

    /// Live records of `tag`, newest first.
    pub fn recent<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a MemoryRecord> + 'a {
        self.tags
            .get(tag)
            .into_iter()
            .flat_map(|records| records.iter().rev())
            .filter(|r| !r.deleted)
    }

    /// Every container tag that has at least one record (live or deleted).
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Number of live records across all tags.
    pub fn active_count(&self) -> usize {
        self.tags
            .values()
            .flat_map(|records| records.iter())
            .filter(|r| !r.deleted)
            .count()
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for (tag, records) in &self.tags {
            let deleted = records.iter().filter(|r| r.deleted).count();
            let tag_stats = TagStats {
                active: records.len() - deleted,
                deleted,
            };
            stats.total += records.len();
            stats.active += tag_stats.active;
            stats.deleted += tag_stats.deleted;
            stats.by_tag.insert(tag.clone(), tag_stats);
        }
        stats
    }

    /// Serialize the whole store in snapshot form.
    pub fn to_snapshot_json(&self, pretty: bool) -> Result<Vec<u8>, MemoryError> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            tags: &self.tags,
        };
        let bytes = if pretty {
            serde_json::to_vec_pretty(&snapshot)?
        } else {
            serde_json::to_vec(&snapshot)?
        };
        Ok(bytes)
    }

    /// Rewrite the snapshot file from the in-memory state.
    fn flush(&self) -> Result<(), MemoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = self.to_snapshot_json(false)?;
        write_private_atomic(path, &bytes).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "snapshot flush failed");
            MemoryError::Io(e)
        })
    }

    fn contains_id(&self, tag: &str, id: &str) -> bool {
        self.tags
            .get(tag)
            .is_some_and(|records| records.iter().any(|r| r.id == id))
    }

    fn rollback_append(&mut self, tag: &str) {
        let now_empty = match self.tags.get_mut(tag) {
            Some(records) => {
                records.pop();
                records.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.tags.remove(tag);
        }
    }

    fn validate(&self, input: &NewMemory) -> Result<(), MemoryError> {
        let limits = &self.limits;

        if input.content.trim().is_empty() {
            return Err(MemoryError::validation("content must not be empty"));
        }
        if input.content.len() > limits.max_content_bytes {
            return Err(MemoryError::validation(format!(
                "content exceeds {} bytes",
                limits.max_content_bytes
            )));
        }
        if input.tag.is_empty() {
            return Err(MemoryError::validation("containerTag must not be empty"));
        }
        if input.tag.len() > limits.max_tag_bytes {
            return Err(MemoryError::validation(format!(
                "containerTag exceeds {} bytes",
                limits.max_tag_bytes
            )));
        }
        if let Some(id) = &input.custom_id {
            if id.trim().is_empty() {
                return Err(MemoryError::validation("customId must not be empty"));
            }
            if id.len() > limits.max_id_bytes {
                return Err(MemoryError::validation(format!(
                    "customId exceeds {} bytes",
                    limits.max_id_bytes
                )));
            }
        }
        if input.metadata.len() > limits.max_metadata_entries {
            return Err(MemoryError::validation(format!(
                "metadata has more than {} entries",
                limits.max_metadata_entries
            )));
        }
        for (key, value) in &input.metadata {
            if key.len() > limits.max_metadata_key_bytes {
                return Err(MemoryError::validation(format!(
                    "metadata key exceeds {} bytes",
                    limits.max_metadata_key_bytes
                )));
            }
            if value.byte_len() > limits.max_metadata_value_bytes {
                return Err(MemoryError::validation(format!(
                    "metadata value for {key} exceeds {} bytes",
                    limits.max_metadata_value_bytes
                )));
            }
        }
        Ok(())
    }
}

/// Move an unreadable snapshot out of the way so the next flush cannot overwrite it.
fn quarantine(path: &Path) -> Result<PathBuf, MemoryError> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".corrupt-{}", Utc::now().timestamp()));
    let target = path.with_file_name(name);
    std::fs::rename(path, &target)?;
    Ok(target)
}
