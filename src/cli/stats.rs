use anyhow::Result;

use memhost::config::MemhostConfig;

/// Display store statistics in the terminal.
pub fn stats(config: &MemhostConfig, tag: Option<&str>) -> Result<()> {
    let store = super::open_snapshot(config)?;
    let stats = store.stats();

    let snapshot_path = config.snapshot_path();
    let size = std::fs::metadata(&snapshot_path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total records:       {}", stats.total);
    println!("  Active:              {}", stats.active);
    println!("  Deleted:             {}", stats.deleted);
    println!();

    println!("By Container Tag:");
    let rows: Vec<_> = stats
        .by_tag
        .iter()
        .filter(|(name, _)| tag.map_or(true, |t| t == name.as_str()))
        .collect();
    if rows.is_empty() {
        println!("  (none)");
    }
    for (name, counts) in rows {
        println!(
            "  {:<24} {} active, {} deleted",
            name, counts.active, counts.deleted
        );
    }
    println!();

    println!("Snapshot:              {}", snapshot_path.display());
    println!("Snapshot size:         {size} bytes");

    Ok(())
}
