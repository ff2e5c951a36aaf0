//! Crewline Configuration Module
//!
//! Persistent defaults for providers and runs, stored in
//! `~/.config/crewline/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags (`--provider`, `--model`, `--timeout`)
//! 2. Environment variables (`OPENAI_API_KEY`, `CREWLINE_PROVIDER`, `CREWLINE_MODEL`)
//! 3. Config file
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CrewError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CrewConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub api_keys: ApiKeys,

    #[serde(default)]
    pub run: RunSettings,
}

/// Provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderSettings {
    /// mock, openai or ollama
    pub name: Option<String>,

    /// Default model (gpt-4o-mini, llama3.2, ...)
    pub model: Option<String>,

    /// Chat completions base URL (OpenAI-compatible servers)
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiKeys {
    /// OpenAI API key (sk-...)
    pub openai: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSettings {
    /// Per-task invocation timeout (unset = no timeout)
    pub task_timeout_secs: Option<u64>,
}

impl CrewConfig {
    /// `~/.config/crewline/` on Unix, `%APPDATA%/crewline/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crewline")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load the user config (default config if the file doesn't exist)
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load from an explicit path.
    ///
    /// Missing file = defaults; a malformed file is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| CrewError::ConfigError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| CrewError::ConfigError {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Merge process environment variables over file values
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Merge variables from `lookup` (empty values are ignored)
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_keys.openai = Some(key);
        }
        if let Some(name) = get("CREWLINE_PROVIDER") {
            self.provider.name = Some(name);
        }
        if let Some(model) = get("CREWLINE_MODEL") {
            self.provider.model = Some(model);
        }
        self
    }

    pub fn openai_key(&self) -> Option<&str> {
        self.api_keys.openai.as_deref()
    }

    /// Configured provider, or auto-detect from available keys
    pub fn provider_name(&self) -> &str {
        match self.provider.name.as_deref() {
            Some(name) => name,
            None if self.api_keys.openai.is_some() => "openai",
            None => "mock",
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.model.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.provider.base_url.as_deref()
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.run.task_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_path_ends_with_crewline_toml() {
        let path = CrewConfig::config_path();
        assert!(path.to_string_lossy().contains("crewline"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CrewConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CrewConfig::default());
        assert_eq!(config.provider_name(), "mock");
        assert_eq!(config.task_timeout(), None);
    }

    #[test]
    fn parses_all_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[provider]
name = "ollama"
model = "llama3.2"
base_url = "http://localhost:11434/v1"

[api_keys]
openai = "sk-file"

[run]
task_timeout_secs = 90
"#,
        )
        .unwrap();

        let config = CrewConfig::load_from(&path).unwrap();
        assert_eq!(config.provider_name(), "ollama");
        assert_eq!(config.model(), Some("llama3.2"));
        assert_eq!(config.base_url(), Some("http://localhost:11434/v1"));
        assert_eq!(config.openai_key(), Some("sk-file"));
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[provider\nname = ").unwrap();
        let err = CrewConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, CrewError::ConfigError { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = CrewConfig {
            provider: ProviderSettings {
                name: Some("mock".into()),
                model: Some("file-model".into()),
                base_url: None,
            },
            api_keys: ApiKeys {
                openai: Some("sk-file".into()),
            },
            run: RunSettings::default(),
        }
        .with_env_from(env(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("CREWLINE_PROVIDER", "openai"),
            ("CREWLINE_MODEL", ""),
        ]));

        assert_eq!(config.openai_key(), Some("sk-env"));
        assert_eq!(config.provider_name(), "openai");
        // Empty values don't clobber the file
        assert_eq!(config.model(), Some("file-model"));
    }

    #[test]
    fn provider_auto_detects_openai_key() {
        let config = CrewConfig::default().with_env_from(env(&[("OPENAI_API_KEY", "sk-x")]));
        assert_eq!(config.provider_name(), "openai");
    }
}
