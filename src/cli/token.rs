//! CLI `token` command: print the bearer token hook clients should send.

use anyhow::Result;

use memhost::auth::AuthToken;
use memhost::config::MemhostConfig;

/// Print the token (creating it if this is the first run), or only its path.
pub fn token(config: &MemhostConfig, path_only: bool) -> Result<()> {
    let path = config.token_path();
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }

    let token = AuthToken::load_or_create(&path)?;
    println!("{}", token.as_str());
    Ok(())
}
