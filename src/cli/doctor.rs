//! CLI `doctor` command: check the data directory and print a health report.

use anyhow::Result;
use std::path::Path;

use memhost::auth::AuthToken;
use memhost::config::MemhostConfig;
use memhost::memory::store::MemoryStore;
use memhost::util::file_mode;

/// Inspect snapshot and token files without modifying either.
pub fn doctor(config: &MemhostConfig) -> Result<()> {
    let snapshot_path = config.snapshot_path();
    let token_path = config.token_path();

    println!("memhost Health Report");
    println!("=====================");
    println!();
    println!("Data directory:    {}", config.resolved_data_dir().display());
    println!("Listen address:    127.0.0.1:{}", config.server.port);
    println!();

    let mut problems = 0;

    println!("Snapshot:          {}", snapshot_path.display());
    if !snapshot_path.exists() {
        println!("  Status:          not created yet (first write creates it)");
    } else {
        let size = std::fs::metadata(&snapshot_path).map(|m| m.len()).unwrap_or(0);
        println!("  Size:            {}", format_bytes(size));
        problems += report_mode(&snapshot_path);
        match MemoryStore::read_snapshot(&snapshot_path) {
            Ok(snapshot) => {
                let store = MemoryStore::from_snapshot(snapshot, config.limits.clone());
                let stats = store.stats();
                println!("  Parse:           OK");
                println!("  Records:         {} active, {} deleted", stats.active, stats.deleted);
                println!("  Container tags:  {}", stats.by_tag.len());
            }
            Err(e) => {
                problems += 1;
                println!("  Parse:           FAILED ({e})");
                println!("  The server will move this file aside and start empty.");
            }
        }
    }
    println!();

    println!("Token:             {}", token_path.display());
    if !token_path.exists() {
        println!("  Status:          not created yet (run `memhost token` or start the server)");
    } else {
        problems += report_mode(&token_path);
        match std::fs::read_to_string(&token_path)
            .map_err(anyhow::Error::from)
            .and_then(|s| AuthToken::parse(&s))
        {
            Ok(_) => println!("  Format:          OK"),
            Err(e) => {
                problems += 1;
                println!("  Format:          INVALID ({e})");
            }
        }
    }

    if problems > 0 {
        println!();
        println!("Recovery steps:");
        println!("  1. Restore the snapshot from a backup, or from a `.corrupt-*` copy after fixing it");
        println!("  2. Delete an invalid token file; a new token is generated on next start");
        println!("  3. chmod 600 any file reported as too permissive");
    }

    Ok(())
}

/// Print the permission check for `path`; returns 1 if it is readable by others.
fn report_mode(path: &Path) -> usize {
    match file_mode(path) {
        Ok(Some(mode)) if mode & 0o077 != 0 => {
            println!("  Permissions:     {mode:o} (too permissive, expected 600)");
            1
        }
        Ok(Some(mode)) => {
            println!("  Permissions:     {mode:o}");
            0
        }
        Ok(None) => 0,
        Err(e) => {
            println!("  Permissions:     unknown ({e})");
            1
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
