// ABOUTME: Configuration loading for clawlog.
// ABOUTME: Reads ~/.clawlog/config.toml; CLI flags override file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::session::Format;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
}

/// Where and how session logs are stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one log file per session. Defaults to
    /// `Config::sessions_dir()` when unset.
    pub base_dir: Option<PathBuf>,
    pub format: Format,
    /// Reads of session files larger than this many bytes are refused.
    pub max_file_size: Option<u64>,
}

impl StoreConfig {
    pub fn resolved_base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .unwrap_or_else(Config::sessions_dir)
    }
}

impl Config {
    /// Load config from ~/.clawlog/config.toml, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Path to the config file.
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clawlog")
            .join("config.toml")
    }

    /// Default session log directory (~/.local/share/clawlog/sessions on Linux).
    pub fn sessions_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clawlog")
            .join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.store.format, Format::Jsonl);
        assert!(config.store.base_dir.is_none());
        assert!(config.store.max_file_size.is_none());
        assert_eq!(config.store.resolved_base_dir(), Config::sessions_dir());
    }

    #[test]
    fn parse_config_toml() {
        let toml_str = r#"
[store]
base_dir = "/srv/agent/history"
format = "markdown"
max_file_size = 1048576
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.store.resolved_base_dir(),
            PathBuf::from("/srv/agent/history")
        );
        assert_eq!(config.store.format, Format::Markdown);
        assert_eq!(config.store.max_file_size, Some(1_048_576));
    }

    #[test]
    fn parse_format_alias() {
        let config: Config = toml::from_str("[store]\nformat = \"transcript\"\n").unwrap();
        assert_eq!(config.store.format, Format::Markdown);
    }

    #[test]
    fn parse_format_ignores_case() {
        let config: Config = toml::from_str("[store]\nformat = \"Markdown\"\n").unwrap();
        assert_eq!(config.store.format, Format::Markdown);
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[store]\nmax_file_size = 10\n").unwrap();
        assert_eq!(config.store.format, Format::Jsonl);
        assert_eq!(config.store.max_file_size, Some(10));
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert!(config.store.base_dir.is_none());
    }

    #[test]
    fn load_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nformat = \"yaml\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
