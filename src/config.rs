//! Configuration management for Chathist
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChathistError, Result};
use crate::history::SearchField;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for Chathist
///
/// This structure holds where conversation history is stored and how the
/// history view searches and shares it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record store location
    #[serde(default)]
    pub storage: StorageConfig,
    /// History view behavior
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the `sled` database directory
    ///
    /// When unset, the platform data directory is used (for example
    /// `~/.local/share/chathist/history.db` on Linux).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// History view configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Origin that share links are built under
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Record fields a search query is matched against
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<SearchField>,
}

fn default_base_url() -> Url {
    Url::parse("http://localhost:5173/").expect("default base url is valid")
}

fn default_search_fields() -> Vec<SearchField> {
    vec![SearchField::Description]
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_fields: default_search_fields(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChathistError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChathistError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(db) = std::env::var("CHATHIST_DB") {
            tracing::debug!(db = %db, "Env override: CHATHIST_DB");
            self.storage.path = Some(PathBuf::from(db));
        }

        if let Ok(base_url) = std::env::var("CHATHIST_BASE_URL") {
            match Url::parse(&base_url) {
                Ok(url) => {
                    self.history.base_url = url;
                    tracing::debug!(base_url = %base_url, "Env override: CHATHIST_BASE_URL");
                }
                Err(e) => {
                    tracing::warn!("Invalid CHATHIST_BASE_URL: {} ({})", base_url, e);
                }
            }
        }

        if let Ok(fields) = std::env::var("CHATHIST_SEARCH_FIELDS") {
            let parsed: std::result::Result<Vec<SearchField>, _> = fields
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(list) if !list.is_empty() => {
                    tracing::debug!(?list, "Env override: CHATHIST_SEARCH_FIELDS");
                    self.history.search_fields = list;
                }
                Ok(_) => tracing::warn!("CHATHIST_SEARCH_FIELDS is empty, ignoring"),
                Err(e) => tracing::warn!("Invalid CHATHIST_SEARCH_FIELDS: {}", e),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db) = &cli.db {
            tracing::info!("Using storage DB override from CLI: {}", db.display());
            self.storage.path = Some(db.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Resolve the database location
    ///
    /// # Errors
    ///
    /// Returns error if no path is configured and the platform data
    /// directory cannot be determined
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let dirs = ProjectDirs::from("dev", "chathist", "chathist").ok_or_else(|| {
            ChathistError::Config("Could not determine a data directory".to_string())
        })?;
        Ok(dirs.data_dir().join("history.db"))
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.storage.path {
            if path.as_os_str().is_empty() {
                return Err(
                    ChathistError::Config("storage.path cannot be empty".to_string()).into(),
                );
            }
        }

        let scheme = self.history.base_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ChathistError::Config(format!(
                "history.base_url must use http or https, got: {}",
                scheme
            ))
            .into());
        }

        if self.history.base_url.cannot_be_a_base() {
            return Err(ChathistError::Config(
                "history.base_url cannot hold a path".to_string(),
            )
            .into());
        }

        if self.history.search_fields.is_empty() {
            return Err(ChathistError::Config(
                "history.search_fields must name at least one field".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use serial_test::serial;

    fn cli_with_db(db: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            db,
            verbose: false,
            command: Commands::List {
                query: None,
                grouped: false,
            },
        }
    }

    fn clear_env() {
        std::env::remove_var("CHATHIST_DB");
        std::env::remove_var("CHATHIST_BASE_URL");
        std::env::remove_var("CHATHIST_SEARCH_FIELDS");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.storage.path.is_none());
        assert_eq!(config.history.base_url.as_str(), "http://localhost:5173/");
        assert_eq!(config.history.search_fields, vec![SearchField::Description]);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_search_fields() {
        let mut config = Config::default();
        config.history.search_fields.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_base() {
        let mut config = Config::default();
        config.history.base_url = Url::parse("mailto:someone@example.com").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_storage_path() {
        let mut config = Config::default();
        config.storage.path = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
storage:
  path: /var/lib/chathist/history.db
history:
  base_url: https://chat.example.dev/app/
  search_fields: [description, url_id, id]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.storage.path,
            Some(PathBuf::from("/var/lib/chathist/history.db"))
        );
        assert_eq!(config.history.base_url.path(), "/app/");
        assert_eq!(config.history.search_fields.len(), 3);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("history: {}\n").unwrap();
        assert_eq!(config.history, HistoryConfig::default());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_unknown_search_field_fails_to_parse() {
        let yaml = "history:\n  search_fields: [title]\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        clear_env();
        let config = Config::load("nonexistent.yaml", &cli_with_db(None)).unwrap();
        assert!(config.storage.path.is_none());
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    #[serial]
    fn test_cli_db_overrides_env() {
        clear_env();
        std::env::set_var("CHATHIST_DB", "/from/env");
        let config =
            Config::load("nonexistent.yaml", &cli_with_db(Some(PathBuf::from("/from/cli"))))
                .unwrap();
        assert_eq!(config.db_path().unwrap(), PathBuf::from("/from/cli"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_history() {
        clear_env();
        std::env::set_var("CHATHIST_DB", "/tmp/chathist-env.db");
        std::env::set_var("CHATHIST_BASE_URL", "https://share.example.dev");
        std::env::set_var("CHATHIST_SEARCH_FIELDS", "description, id");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(
            config.storage.path,
            Some(PathBuf::from("/tmp/chathist-env.db"))
        );
        assert_eq!(config.history.base_url.host_str(), Some("share.example.dev"));
        assert_eq!(
            config.history.search_fields,
            vec![SearchField::Description, SearchField::Id]
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clear_env();
        std::env::set_var("CHATHIST_BASE_URL", "not a url");
        std::env::set_var("CHATHIST_SEARCH_FIELDS", "description,title");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(config.history, HistoryConfig::default());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let dir = crate::test_utils::temp_dir();
        let path = crate::test_utils::create_test_file(
            &dir,
            "config.yaml",
            &crate::test_utils::test_config_yaml(),
        );
        let config = Config::load(path.to_str().unwrap(), &cli_with_db(None)).unwrap();
        assert_eq!(
            config.db_path().unwrap(),
            PathBuf::from("/tmp/chathist-test/history.db")
        );
        assert_eq!(config.history.base_url.host_str(), Some("chat.example.dev"));
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let dir = crate::test_utils::temp_dir();
        let path = crate::test_utils::create_test_file(&dir, "config.yaml", "history: [1, 2");
        let err = Config::load(path.to_str().unwrap(), &cli_with_db(None)).unwrap_err();
        assert!(matches!(
            ChathistError::classify(err),
            ChathistError::Config(_)
        ));
    }
}
