use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MemhostConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub log_level: String,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub snapshot_file: String,
    pub token_file: String,
    pub default_tag: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_search_limit: usize,
    pub default_list_limit: usize,
    pub max_list_limit: usize,
    pub profile_window: usize,
    pub profile_max_facts: usize,
}

/// Caps applied to caller-supplied fields before anything reaches the store.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_content_bytes: usize,
    pub max_metadata_entries: usize,
    pub max_metadata_key_bytes: usize,
    pub max_metadata_value_bytes: usize,
    pub max_id_bytes: usize,
    pub max_tag_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 19280,
            log_level: "info".into(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_memhost_dir().to_string_lossy().into_owned(),
            snapshot_file: "memories.json".into(),
            token_file: "token".into(),
            default_tag: "default".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_search_limit: 10,
            default_list_limit: 20,
            max_list_limit: 1000,
            profile_window: 50,
            profile_max_facts: 10,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 1024 * 1024,
            max_metadata_entries: 64,
            max_metadata_key_bytes: 128,
            max_metadata_value_bytes: 4096,
            max_id_bytes: 256,
            max_tag_bytes: 256,
        }
    }
}

/// Returns `~/.memhost/`, falling back to `./.memhost` when no home directory is known.
pub fn default_memhost_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memhost")
}

/// Returns the default config file path: `~/.memhost/config.toml`
pub fn default_config_path() -> PathBuf {
    default_memhost_dir().join("config.toml")
}

impl MemhostConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemhostConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MEMHOST_PORT, MEMHOST_DATA_DIR, MEMHOST_DEFAULT_TAG, MEMHOST_LOG_LEVEL).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("MEMHOST_PORT") {
            self.server.port = val
                .trim()
                .parse()
                .with_context(|| format!("MEMHOST_PORT is not a valid port: {val}"))?;
        }
        if let Ok(val) = std::env::var("MEMHOST_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("MEMHOST_DEFAULT_TAG") {
            self.storage.default_tag = val;
        }
        if let Ok(val) = std::env::var("MEMHOST_LOG_LEVEL") {
            self.server.log_level = val;
        }
        Ok(())
    }

    /// Resolved data directory, with `~` expanded.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// Full path of the JSON snapshot holding every container tag.
    pub fn snapshot_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.storage.snapshot_file)
    }

    /// Full path of the bearer token file.
    pub fn token_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.storage.token_file)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MemhostConfig::default();
        assert_eq!(config.server.port, 19280);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.storage.default_tag, "default");
        assert_eq!(config.retrieval.default_search_limit, 10);
        assert_eq!(config.retrieval.profile_window, 50);
        assert!(config.snapshot_path().ends_with("memories.json"));
        assert!(config.token_path().ends_with("token"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 4000
log_level = "debug"

[storage]
data_dir = "/tmp/memhost-test"
default_tag = "myproject"

[retrieval]
default_search_limit = 5
"#;
        let config: MemhostConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.default_tag, "myproject");
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/tmp/memhost-test/memories.json")
        );
        assert_eq!(config.retrieval.default_search_limit, 5);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.profile_max_facts, 10);
        assert_eq!(config.limits.max_content_bytes, 1024 * 1024);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MemhostConfig::default();
        std::env::set_var("MEMHOST_PORT", "4123");
        std::env::set_var("MEMHOST_DATA_DIR", "/tmp/override");
        std::env::set_var("MEMHOST_DEFAULT_TAG", "env-tag");
        std::env::set_var("MEMHOST_LOG_LEVEL", "trace");

        config.apply_env_overrides().unwrap();

        assert_eq!(config.server.port, 4123);
        assert_eq!(config.storage.data_dir, "/tmp/override");
        assert_eq!(config.storage.default_tag, "env-tag");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("MEMHOST_PORT");
        std::env::remove_var("MEMHOST_DATA_DIR");
        std::env::remove_var("MEMHOST_DEFAULT_TAG");
        std::env::remove_var("MEMHOST_LOG_LEVEL");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/lib/x"), PathBuf::from("/var/lib/x"));
    }
}
