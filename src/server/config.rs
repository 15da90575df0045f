//! Configuration loading for headlinerd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.headliner/config.toml` (user)
//! 3. `/etc/headliner/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.headliner/secrets.toml` (user, must be 0600)
//! 2. `/etc/headliner/secrets.toml` (system, must be 0600)
//! 3. `OPENAI_API_KEY` environment variable

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::gateway::HeadlinerBuilder;
use crate::providers::openai::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::transport::DEFAULT_STREAM_BUFFER;
use crate::types::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GenerateOptions};
use crate::{HeadlinerError, Result};

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub stream: StreamSection,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3000).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Upstream completion provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (default: https://api.openai.com/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overall upstream request timeout in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Message cache limits.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Entry time-to-live in seconds (default: 3600).
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
    /// Maximum number of entries (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_entries() -> u64 {
    10_000
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        CacheConfig::new()
            .ttl(Duration::from_secs(section.ttl_secs))
            .max_entries(section.max_entries)
    }
}

/// Stream relay settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamSection {
    /// Fragments buffered per stream (default: 64).
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

fn default_buffer() -> usize {
    DEFAULT_STREAM_BUFFER
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first file found in the
    /// user and system locations is used, falling back to defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HeadlinerError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HeadlinerError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HeadlinerError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".headliner").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/headliner/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Completion options from the `[provider]` section.
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions::new(&self.provider.model)
            .temperature(self.provider.temperature)
            .max_tokens(self.provider.max_tokens)
    }

    /// A service builder configured from this file and `secrets`.
    pub fn builder(&self, secrets: &Secrets) -> HeadlinerBuilder {
        HeadlinerBuilder::new()
            .openai(secrets.api_key())
            .base_url(&self.provider.base_url)
            .timeout(self.provider.timeout_secs)
            .options(self.generate_options())
            .cache(CacheConfig::from(&self.cache))
            .stream_buffer(self.stream.buffer)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.headliner/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/headliner/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (the key may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        // Try user secrets first
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".headliner").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        // Try system secrets
        let system_secrets = PathBuf::from("/etc/headliner/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Parse a secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            HeadlinerError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HeadlinerError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HeadlinerError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(HeadlinerError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        // Permission check not available on non-Unix platforms
        Ok(())
    }

    /// The upstream API key, falling back to [`API_KEY_ENV`].
    pub fn api_key(&self) -> Option<String> {
        self.openai
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:3000");
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.provider.max_tokens, 200);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.stream.buffer, 64);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:8080"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:8080");
        // Defaults preserved
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.cache.max_entries, 10_000);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9000"

            [provider]
            base_url = "https://openrouter.ai/api/v1"
            model = "openai/gpt-4o-mini"
            temperature = 0.5
            max_tokens = 120
            timeout_secs = 30

            [cache]
            ttl_secs = 600
            max_entries = 50

            [stream]
            buffer = 8
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.provider.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.stream.buffer, 8);

        let options = config.generate_options();
        assert_eq!(options.model, "openai/gpt-4o-mini");
        assert_eq!(options.temperature, Some(0.5));
        assert_eq!(options.max_tokens, Some(120));

        let cache = CacheConfig::from(&config.cache);
        assert_eq!(cache.ttl, Duration::from_secs(600));
        assert_eq!(cache.max_entries, 50);
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [openai]
            api_key = "sk-test-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.api_key(), Some("sk-test-key".to_string()));
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }
}
