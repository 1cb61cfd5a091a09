//! Configuration management for APIXLab.
//!
//! Loads configuration from ${APIXLAB_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for APIXLab configuration and data directories.
    //!
    //! APIXLAB_HOME resolution order:
    //! 1. APIXLAB_HOME environment variable (if set)
    //! 2. ~/.config/apixlab (default)
    //! 3. ./.apixlab when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the APIXLab home directory.
    pub fn apixlab_home() -> PathBuf {
        if let Ok(home) = std::env::var("APIXLAB_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".apixlab"),
            |h| h.join(".config").join("apixlab"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        apixlab_home().join("config.toml")
    }

    /// Returns the default path of the session storage file.
    pub fn storage_path() -> PathBuf {
        apixlab_home().join("storage.json")
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir() -> PathBuf {
        apixlab_home().join("logs")
    }

    /// Expands a leading `~/` to the user's home directory.
    pub fn expand_home(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }
}

/// GraphQL backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,
    /// Per-request timeout in seconds (0 disables)
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub const DEFAULT_ENDPOINT: &str = "https://api.apixlab.com/graphql";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Resolves the endpoint with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not well-formed.
    pub fn resolve_endpoint(&self) -> Result<String> {
        resolve_url(
            Some(&self.endpoint),
            "APIXLAB_ENDPOINT",
            Self::DEFAULT_ENDPOINT,
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key under which the session JSON is stored
    pub storage_key: String,
    /// Optional override for the storage file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl SessionConfig {
    pub const DEFAULT_STORAGE_KEY: &str = "apixlab.session";

    /// Returns the effective storage file path.
    pub fn storage_path(&self) -> PathBuf {
        match self.file.as_deref().map(str::trim) {
            Some(file) if !file.is_empty() => paths::expand_home(file),
            _ => paths::storage_path(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: Self::DEFAULT_STORAGE_KEY.to_string(),
            file: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive
    pub filter: String,
    /// Whether to write logs to `<home>/logs`
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: true,
        }
    }
}

/// One wallet connector entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    pub name: String,
    /// Environment variable holding a hex private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
    /// File holding a hex private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
}

/// Wallet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Connectors in preference order
    pub connectors: Vec<ConnectorConfig>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            connectors: vec![ConnectorConfig {
                id: "env".to_string(),
                name: "Environment key".to_string(),
                key_env: Some("APIXLAB_PRIVATE_KEY".to_string()),
                key_file: None,
            }],
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
    pub wallet: WalletConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}

/// Resolves a URL with precedence: env > config > default.
fn resolve_url(config_url: Option<&str>, env_var: &str, default_url: &str) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = config_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid backend endpoint URL: {url}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.backend.endpoint, BackendConfig::DEFAULT_ENDPOINT);
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.session.storage_key, "apixlab.session");
        assert_eq!(config.wallet.connectors.len(), 1);
        assert_eq!(config.wallet.connectors[0].id, "env");
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.backend.endpoint, defaults.backend.endpoint);
        assert_eq!(parsed.backend.timeout_secs, defaults.backend.timeout_secs);
        assert_eq!(parsed.session.storage_key, defaults.session.storage_key);
        assert_eq!(parsed.wallet.connectors, defaults.wallet.connectors);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[backend]
timeout_secs = 3

[[wallet.connectors]]
id = "keyfile"
name = "Key file"
key_file = "/tmp/key"

[[wallet.connectors]]
id = "env"
name = "Environment key"
key_env = "MY_KEY"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend.endpoint, BackendConfig::DEFAULT_ENDPOINT);
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(3)));
        let ids: Vec<_> = config.wallet.connectors.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["keyfile", "env"]);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let backend = BackendConfig {
            timeout_secs: 0,
            ..BackendConfig::default()
        };
        assert_eq!(backend.timeout(), None);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::init(&path).unwrap();
        assert!(path.exists());
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_resolve_url_rejects_garbage() {
        assert!(resolve_url(Some("not a url"), "APIXLAB_TEST_UNSET_VAR", "http://x").is_err());
        assert_eq!(
            resolve_url(Some("  "), "APIXLAB_TEST_UNSET_VAR", "http://default/").unwrap(),
            "http://default/"
        );
    }
}
