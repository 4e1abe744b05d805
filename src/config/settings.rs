use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::tool::ToolPaths;
use crate::util::paths::config_path;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Configured binary path overrides for agent tools
    pub tool_paths: ToolPaths,
    /// Integration branch used as a worktree base when a shortcut asks
    pub develop_branch: String,
    /// Bound on any single multiplexer call
    pub mux_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_paths: ToolPaths::default(),
            develop_branch: "develop".to_string(),
            mux_timeout: Duration::from_secs(5),
        }
    }
}

/// Raw shape of config.toml; every field optional
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    #[serde(default)]
    tools: ToolPaths,
    develop_branch: Option<String>,
    mux_timeout_ms: Option<u64>,
}

impl Config {
    /// Load from the default location; a missing file yields defaults,
    /// a malformed file is an error surfaced at startup
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let parsed: TomlConfig = toml::from_str(&raw)?;
        Ok(Self::from_toml(parsed))
    }

    fn from_toml(toml: TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            tool_paths: toml.tools,
            develop_branch: toml
                .develop_branch
                .unwrap_or(defaults.develop_branch),
            mux_timeout: toml
                .mux_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.mux_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.develop_branch, "develop");
        assert_eq!(config.mux_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
develop_branch = "main"
mux_timeout_ms = 2500

[tools]
claude = "/opt/bin/claude"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.develop_branch, "main");
        assert_eq!(config.mux_timeout, Duration::from_millis(2500));
        assert_eq!(
            config.tool_paths.claude.as_deref(),
            Some(Path::new("/opt/bin/claude"))
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "develop_branch = [broken").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
