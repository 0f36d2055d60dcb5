use anyhow::Result;
use std::io::Write;

use memhost::config::MemhostConfig;

/// Export the whole store, deleted records included, as pretty JSON to stdout.
///
/// The output is a valid snapshot and can be copied back into place as a restore.
pub fn export(config: &MemhostConfig) -> Result<()> {
    let store = super::open_snapshot(config)?;
    let bytes = store.to_snapshot_json(true)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    writeln!(stdout)?;

    let stats = store.stats();
    eprintln!(
        "Exported {} records ({} deleted) across {} container tags.",
        stats.total,
        stats.deleted,
        stats.by_tag.len()
    );

    Ok(())
}
