#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::DEFAULT_VECTOR_SIZE;

const CONFIG_FILE: &str = "config.toml";
const LEDGER_FILE: &str = "ledger.db";
const DEFAULT_KEEP_RUNS: usize = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Extra tables for the process driver, on top of the built-in catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableConfig>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QdrantConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub max_connections: u32,
    pub statement_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            max_connections: 5,
            statement_timeout_seconds: 60,
        }
    }
}

/// How point ids are assigned during a sync
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PointIdMode {
    /// Position in the table's record stream
    #[default]
    Sequential,
    /// Stable id derived from the table's primary key
    SourceKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub vector_size: usize,
    pub point_ids: PointIdMode,
    pub table_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            vector_size: DEFAULT_VECTOR_SIZE,
            point_ids: PointIdMode::Sequential,
            table_retries: 0,
            retry_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,
    /// Runs kept after each sync; `0` keeps every run
    pub keep_runs: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_runs: DEFAULT_KEEP_RUNS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Columns fed to the embedder; empty means every column
    #[serde(default)]
    pub text_fields: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Vector store URL is not configured (set [qdrant].url or QDRANT_API_URL)")]
    MissingVectorStoreUrl,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid max connections: {0} (must be between 1 and 100)")]
    InvalidMaxConnections(u32),
    #[error("Invalid batch size: {0} (must be between 1 and 10000)")]
    InvalidBatchSize(usize),
    #[error("Invalid vector size: {0} (must be between 1 and 65536)")]
    InvalidVectorSize(usize),
    #[error("Invalid table retries: {0} (must be 10 or less)")]
    InvalidRetries(u32),
    #[error("Invalid retry backoff: {0}ms (must be 60000 or less)")]
    InvalidBackoff(u64),
    #[error("Invalid table name: '{0}' (cannot be empty)")]
    InvalidTableName(String),
    #[error("Table '{0}' is configured more than once")]
    DuplicateTable(String),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnvValue { name: &'static str, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn parse_http_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidProtocol(other.to_string())),
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".catalog-sync"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("catalog-sync"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default directory and apply environment overrides
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_with_env(config_dir, |name| std::env::var(name).ok())
    }

    /// Load from `config_dir` without consulting the environment
    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::load_with_env(config_dir, |_| None)
    }

    #[inline]
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = config_dir.as_ref().join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str::<Self>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .apply_env_overrides(lookup)
            .context("Invalid environment override")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Overlay values from the process environment (or any lookup) onto the file values
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("QDRANT_API_URL") {
            self.qdrant.url = Some(url);
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(key);
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = get("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = get("DB_PORT") {
            self.database.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvValue {
                    name: "DB_PORT",
                    value: port.clone(),
                })?;
        }
        if let Some(name) = get("DB_NAME") {
            self.database.name = name;
        }
        if let Some(user) = get("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = get("DB_PASSWORD") {
            self.database.password = Some(password);
        }

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.qdrant.validate()?;
        self.database.validate()?;
        self.sync.validate()?;

        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(ConfigError::InvalidTableName(table.name.clone()));
            }
            if !seen.insert(table.name.as_str()) {
                return Err(ConfigError::DuplicateTable(table.name.clone()));
            }
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE)
    }

    /// Path of the SQLite sync ledger
    #[inline]
    pub fn ledger_path(&self) -> PathBuf {
        self.get_base_dir().join(LEDGER_FILE)
    }
}

impl QdrantConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = self.url.as_deref().filter(|url| !url.trim().is_empty()) {
            parse_http_url(url)?;
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Base URL of the vector store. An absent URL is fatal for any command that needs the index.
    #[inline]
    pub fn qdrant_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingVectorStoreUrl)?;
        parse_http_url(raw)
    }

    #[inline]
    pub fn set_url(&mut self, url: String) -> Result<(), ConfigError> {
        parse_http_url(&url)?;
        self.url = Some(url);
        Ok(())
    }

    /// Set the API key; a blank key clears it
    #[inline]
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(api_key)
        };
    }

    #[inline]
    pub fn set_timeout_seconds(&mut self, timeout_seconds: u64) -> Result<(), ConfigError> {
        if !(1..=600).contains(&timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(timeout_seconds));
        }
        self.timeout_seconds = timeout_seconds;
        Ok(())
    }
}

impl DatabaseConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = self.url.as_deref() {
            let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
            if !matches!(parsed.scheme(), "postgres" | "postgresql") {
                return Err(ConfigError::InvalidProtocol(parsed.scheme().to_string()));
            }
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if !(1..=100).contains(&self.max_connections) {
            return Err(ConfigError::InvalidMaxConnections(self.max_connections));
        }

        Ok(())
    }
}

impl SyncConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=65_536).contains(&self.vector_size) {
            return Err(ConfigError::InvalidVectorSize(self.vector_size));
        }

        if self.table_retries > 10 {
            return Err(ConfigError::InvalidRetries(self.table_retries));
        }

        if self.retry_backoff_ms > 60_000 {
            return Err(ConfigError::InvalidBackoff(self.retry_backoff_ms));
        }

        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ConfigError> {
        if !(1..=10_000).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    #[inline]
    pub fn set_vector_size(&mut self, vector_size: usize) -> Result<(), ConfigError> {
        if !(1..=65_536).contains(&vector_size) {
            return Err(ConfigError::InvalidVectorSize(vector_size));
        }
        self.vector_size = vector_size;
        Ok(())
    }

    #[inline]
    pub fn set_table_retries(&mut self, table_retries: u32) -> Result<(), ConfigError> {
        if table_retries > 10 {
            return Err(ConfigError::InvalidRetries(table_retries));
        }
        self.table_retries = table_retries;
        Ok(())
    }
}
