//! Configuration management for docsift
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding downloaded documents and the index.
    /// Defaults to the directory containing the config file.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Discovery API configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Document fetching configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Discovery API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Search endpoint URL
    #[serde(default = "default_discovery_endpoint")]
    pub endpoint: String,

    /// Environment variable name for the bearer token
    #[serde(default = "default_discovery_api_key_env")]
    pub api_key_env: String,

    /// Referer header sent with discovery requests
    #[serde(default)]
    pub referer: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// Candidate URLs requested per full query
    #[serde(default = "default_discovery_candidate_limit")]
    pub candidate_limit: usize,

    /// Hits summarised by `discover`
    #[serde(default = "default_discovery_summary_limit")]
    pub summary_limit: usize,
}

/// Document fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Concurrent fetches per batch
    #[serde(default = "default_fetch_concurrency")]
    pub concurrency: usize,

    /// Delay before each request (milliseconds)
    #[serde(default = "default_fetch_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_fetch_user_agent")]
    pub user_agent: String,
}

/// Index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Marker inserted before a highlighted match
    #[serde(default = "default_highlight_pre")]
    pub highlight_pre: String,

    /// Marker inserted after a highlighted match
    #[serde(default = "default_highlight_post")]
    pub highlight_post: String,

    /// Terms the segmenter must keep whole
    #[serde(default = "default_custom_terms")]
    pub custom_terms: Vec<String>,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results
    #[serde(default = "default_query_max_results")]
    pub default_max_results: usize,

    /// Maximum results allowed
    #[serde(default = "default_query_results_cap")]
    pub max_results: usize,
}

/// Paths configuration (computed, not stored)
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub url_map_file: PathBuf,
    pub index_dir: PathBuf,
}

impl PathsConfig {
    fn resolve(config_file: PathBuf, base_dir: PathBuf, data_dir: Option<&Path>) -> Self {
        let data = data_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.join("data"));
        let docs_dir = data.join("docs");
        Self {
            url_map_file: docs_dir.join("url_map.json"),
            index_dir: data.join("index"),
            docs_dir,
            data_dir: data,
            config_file,
            base_dir,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            discovery: DiscoveryConfig::default(),
            fetch: FetchConfig::default(),
            index: IndexConfig::default(),
            query: QueryConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_discovery_endpoint(),
            api_key_env: default_discovery_api_key_env(),
            referer: None,
            timeout_secs: default_discovery_timeout(),
            candidate_limit: default_discovery_candidate_limit(),
            summary_limit: default_discovery_summary_limit(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_fetch_concurrency(),
            request_delay_ms: default_fetch_request_delay_ms(),
            timeout_secs: default_fetch_timeout(),
            user_agent: default_fetch_user_agent(),
        }
    }
}

impl FetchConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            highlight_pre: default_highlight_pre(),
            highlight_post: default_highlight_post(),
            custom_terms: default_custom_terms(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_query_max_results(),
            max_results: default_query_results_cap(),
        }
    }
}

impl Config {
    /// Get the default base directory for docsift (~/.docsift)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docsift")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig::resolve(base.join("config.toml"), base, self.data_dir.as_deref());
    }

    /// Default configuration whose paths live next to `config_path`
    pub fn at(config_path: &Path) -> Self {
        let mut config = Config::default();
        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig::resolve(config_path.to_path_buf(), base, None);
        config
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths =
            PathsConfig::resolve(config_path.to_path_buf(), base, config.data_dir.as_deref());

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = PathsConfig::resolve(
                config.paths.config_file.clone(),
                config.paths.base_dir.clone(),
                loaded.data_dir.as_deref(),
            );
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Bearer token for the discovery API, if the configured variable is set
    pub fn discovery_api_key(&self) -> Option<String> {
        std::env::var(&self.discovery.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Clamp a caller-supplied result count to the configured bounds
    pub fn clamp_results(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.query.default_max_results)
            .clamp(1, self.query.max_results)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(Error::Config(
                "fetch.concurrency must be at least 1".to_string(),
            ));
        }

        if self.query.default_max_results == 0 {
            return Err(Error::Config(
                "query.default_max_results must be at least 1".to_string(),
            ));
        }

        if self.query.max_results < self.query.default_max_results {
            return Err(Error::Config(
                "query.max_results must be >= query.default_max_results".to_string(),
            ));
        }

        if self.discovery.candidate_limit == 0 {
            return Err(Error::Config(
                "discovery.candidate_limit must be at least 1".to_string(),
            ));
        }

        if self.index.highlight_pre.is_empty() || self.index.highlight_post.is_empty() {
            return Err(Error::Config(
                "index.highlight_pre and index.highlight_post must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetch.concurrency, 5);
        assert_eq!(config.fetch.request_delay(), Duration::from_secs(1));
        assert_eq!(config.discovery.candidate_limit, 50);
        assert_eq!(config.index.highlight_pre, "<mark>");
        assert!(config.index.custom_terms.iter().any(|t| t == "掘金量化"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.fetch.concurrency = 2;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.fetch.concurrency, 2);
        assert_eq!(loaded.paths.docs_dir, tmp.path().join("data").join("docs"));
        assert_eq!(
            loaded.paths.url_map_file,
            tmp.path().join("data").join("docs").join("url_map.json")
        );
    }

    #[test]
    fn test_data_dir_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let data = tmp.path().join("elsewhere");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n\n[fetch]\nrequest_delay_ms = 0\n", data),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.paths.index_dir, data.join("index"));
        assert_eq!(config.fetch.request_delay_ms, 0);
        assert_eq!(config.fetch.concurrency, 5);
    }

    #[test]
    fn test_config_at() {
        let tmp = TempDir::new().unwrap();
        let config = Config::at(&tmp.path().join("config.toml"));
        assert_eq!(config.paths.data_dir, tmp.path().join("data"));
        assert_eq!(config.paths.index_dir, tmp.path().join("data").join("index"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.fetch.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.query.max_results = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_results() {
        let config = Config::default();
        assert_eq!(config.clamp_results(None), 10);
        assert_eq!(config.clamp_results(Some(0)), 1);
        assert_eq!(config.clamp_results(Some(5000)), 100);
    }
}
