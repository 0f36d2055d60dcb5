pub mod doctor;
pub mod export;
pub mod inspect;
pub mod search;
pub mod stats;
pub mod token;

use anyhow::{Context, Result};

use memhost::config::MemhostConfig;
use memhost::memory::store::MemoryStore;

/// Load the snapshot for read-only CLI use.
///
/// Unlike the server, a corrupt snapshot is an error here and is left untouched on disk.
pub fn open_snapshot(config: &MemhostConfig) -> Result<MemoryStore> {
    let path = config.snapshot_path();
    if !path.exists() {
        return Ok(MemoryStore::in_memory(config.limits.clone()));
    }
    let snapshot = MemoryStore::read_snapshot(&path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    Ok(MemoryStore::from_snapshot(snapshot, config.limits.clone()))
}

/// Cut `text` to `max` characters, appending "..." when shortened.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
