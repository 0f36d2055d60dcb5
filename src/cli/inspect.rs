//! CLI `inspect` command: display full details for a single memory.

use anyhow::{Context, Result};

use memhost::config::MemhostConfig;

/// Inspect a single record by id and display full details.
///
/// Without `--tag`, every tag is searched. Soft-deleted records are shown too.
pub fn inspect(config: &MemhostConfig, id: &str, tag: Option<&str>) -> Result<()> {
    let path = config.snapshot_path();
    let snapshot = memhost::memory::store::MemoryStore::read_snapshot(&path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;

    let found = snapshot
        .tags
        .iter()
        .filter(|(name, _)| tag.map_or(true, |t| t == name.as_str()))
        .flat_map(|(name, records)| records.iter().map(move |r| (name, r)))
        .find(|(_, r)| r.id == id);

    let Some((tag_name, m)) = found else {
        println!("No memory with id {id}.");
        return Ok(());
    };

    println!("Memory: {}", m.id);
    println!("{}", "=".repeat(50));
    println!("  Container tag:  {tag_name}");
    if let Some(ref title) = m.title {
        println!("  Title:          {title}");
    }
    println!("  Created:        {}", m.created_at.to_rfc3339());
    println!("  Updated:        {}", m.updated_at.to_rfc3339());
    println!("  Deleted:        {}", m.deleted);
    if !m.metadata.is_empty() {
        println!("  Metadata:");
        for (key, value) in &m.metadata {
            println!("    {key}: {value}");
        }
    }
    println!();
    println!("Content:");
    println!("  {}", m.content);

    Ok(())
}
