use anyhow::Result;

use memhost::config::MemhostConfig;
use memhost::memory::search::search;

/// Run a ranked search from the terminal.
pub fn search_cmd(config: &MemhostConfig, query: &str, tag: Option<&str>, limit: Option<usize>) -> Result<()> {
    let store = super::open_snapshot(config)?;
    let tag = tag.unwrap_or(&config.storage.default_tag);
    let limit = limit.unwrap_or(config.retrieval.default_search_limit);

    let hits = search(&store, tag, query, limit);

    if hits.is_empty() {
        println!("No results found in {tag}.");
        return Ok(());
    }

    println!("Found {} result(s) in {tag}\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. {} (similarity: {:.2}, score: {:.2})",
            i + 1,
            hit.record.id,
            hit.similarity,
            hit.score,
        );
        println!("     {}", super::preview(&hit.record.content, 120));
        println!();
    }

    Ok(())
}
