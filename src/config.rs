//! Configuration for the harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.
//! Credentials end up in [`LlmConfig::api_key`] and are handed to the
//! client constructor; nothing here writes to the process environment.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Plaintext file holding the API key, read when `api_key` is empty
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,

    /// Model name used as the judge
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Key file looked up next to the working directory when nothing else is set.
pub const DEFAULT_API_KEY_FILE: &str = "openai_api_key.txt";

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com".to_string(),
            api_key: String::new(),
            api_key_file: Some(PathBuf::from(DEFAULT_API_KEY_FILE)),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Fill `api_key` from `api_key_file` if no key was given directly.
    ///
    /// A missing key file is not an error here; [`Config::validate`] reports
    /// the absent key instead.
    pub fn resolve_api_key(&mut self) -> Result<()> {
        if !self.api_key.is_empty() {
            return Ok(());
        }
        let Some(path) = &self.api_key_file else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let key = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        self.api_key = key.trim().to_string();
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings for the external RAG indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Base URL of the indexing service.
    pub endpoint: String,

    /// Directory the indexer keeps its storage in. When unset, derived from
    /// the dataset class (see [`IndexerConfig::working_dir_for`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Parallel embedding calls the indexer may issue.
    #[serde(default = "default_concurrency_limit")]
    pub embedding_concurrency_limit: usize,

    /// Parallel LLM calls the indexer may issue.
    #[serde(default = "default_concurrency_limit")]
    pub llm_concurrency_limit: usize,
}

fn default_concurrency_limit() -> usize {
    4
}

/// Dataset class used when none is named.
pub const DEFAULT_CLASS: &str = "sample";

impl IndexerConfig {
    /// Storage directory for `class`: the configured one if set, else
    /// `expr/ultradoman/<class>`.
    pub fn working_dir_for(&self, class: &str) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(|| Path::new("expr/ultradoman").join(class))
    }

    /// Pin the working directory to `class` unless one was set explicitly.
    pub fn for_class(mut self, class: &str) -> Self {
        self.working_dir = Some(self.working_dir_for(class));
        self
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8020".to_string(),
            working_dir: None,
            embedding_concurrency_limit: default_concurrency_limit(),
            llm_concurrency_limit: default_concurrency_limit(),
        }
    }
}

/// Retry settings for corpus insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total insert attempts, including the first.
    pub max_attempts: u32,

    /// Fixed pause between attempts, in seconds.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_secs: 10,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Indexer settings
    pub indexer: IndexerConfig,
    /// Insert retry settings
    pub retry: RetryConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    indexer: Option<IndexerFileSection>,
    retry: Option<RetryFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    api_key_file: Option<PathBuf>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct IndexerFileSection {
    endpoint: Option<String>,
    working_dir: Option<PathBuf>,
    embedding_concurrency_limit: Option<usize>,
    llm_concurrency_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RetryFileSection {
    max_attempts: Option<u32>,
    delay_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL, ...)
    /// 2. Config file (`explicit` if given, else ~/.config/rag-harness/config.yaml)
    /// 3. Default values
    ///
    /// The API key file is read last, only when no key was supplied.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::config_file_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Config::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok());
        config.llm.resolve_api_key()?;

        Ok(config)
    }

    /// Override values from a variable lookup (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = lookup("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(api_key) = lookup("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }

        if let Some(key_file) = lookup("LLM_API_KEY_FILE") {
            self.llm.api_key_file = Some(PathBuf::from(key_file));
        }

        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(tokens) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = tokens;
        }

        if let Some(temp) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = temp;
        }

        if let Some(endpoint) = lookup("RAG_INDEXER_ENDPOINT") {
            self.indexer.endpoint = endpoint;
        }

        if let Some(dir) = lookup("RAG_WORKING_DIR") {
            self.indexer.working_dir = Some(PathBuf::from(dir));
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document, falling back to defaults for absent keys.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(api_key_file) = llm.api_key_file {
                config.llm.api_key_file = Some(api_key_file);
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
            if let Some(timeout) = llm.request_timeout_secs {
                config.llm.request_timeout_secs = timeout;
            }
        }

        if let Some(indexer) = file_config.indexer {
            if let Some(endpoint) = indexer.endpoint {
                config.indexer.endpoint = endpoint;
            }
            if let Some(working_dir) = indexer.working_dir {
                config.indexer.working_dir = Some(working_dir);
            }
            if let Some(limit) = indexer.embedding_concurrency_limit {
                config.indexer.embedding_concurrency_limit = limit;
            }
            if let Some(limit) = indexer.llm_concurrency_limit {
                config.indexer.llm_concurrency_limit = limit;
            }
        }

        if let Some(retry) = file_config.retry {
            if let Some(max_attempts) = retry.max_attempts {
                config.retry.max_attempts = max_attempts;
            }
            if let Some(delay_secs) = retry.delay_secs {
                config.retry.delay_secs = delay_secs;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-harness")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the LLM settings needed by the judge are present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(HarnessError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            let hint = self
                .llm
                .api_key_file
                .as_ref()
                .map(|p| format!(", add to config file, or write it to '{}'", p.display()))
                .unwrap_or_else(|| " or add to config file".to_string());
            return Err(HarnessError::Config(format!(
                "LLM API key is required. Set LLM_API_KEY environment variable{}.",
                hint
            )));
        }

        if self.llm.model.is_empty() {
            return Err(HarnessError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the settings the ingestion driver needs.
    pub fn validate_indexer(&self) -> Result<()> {
        if self.indexer.endpoint.is_empty() {
            return Err(HarnessError::InvalidConfig(
                "indexer endpoint is required (RAG_INDEXER_ENDPOINT)".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HarnessError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                api_key_file: None,
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.api_base, "https://api.openai.com");
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.indexer.embedding_concurrency_limit, 4);
        assert_eq!(config.indexer.llm_concurrency_limit, 4);
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.delay_secs, 10);
    }

    #[test]
    fn test_validate_fails_without_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("openai_api_key.txt"));
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_sections_override_defaults() {
        let yaml = r#"
llm:
  model: gpt-4o
  temperature: 0.2
indexer:
  working_dir: expr/ultradoman/cardiology
  llm_concurrency_limit: 8
retry:
  max_attempts: 3
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            config.indexer.working_dir,
            Some(PathBuf::from("expr/ultradoman/cardiology"))
        );
        assert_eq!(config.indexer.llm_concurrency_limit, 8);
        assert_eq!(config.indexer.embedding_concurrency_limit, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_secs, 10);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_yaml("llm:\n  model: from-file\n").unwrap();
        let vars: HashMap<&str, &str> = [
            ("LLM_MODEL", "from-env"),
            ("LLM_MAX_TOKENS", "256"),
            ("LLM_TEMPERATURE", "not-a-float"),
            ("RAG_WORKING_DIR", "/tmp/rag"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.model, "from-env");
        assert_eq!(config.llm.max_tokens, 256);
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.indexer.working_dir, Some(PathBuf::from("/tmp/rag")));
    }

    #[test]
    fn test_working_dir_follows_class_by_default() {
        let indexer = Config::default().indexer.for_class("cardiology");
        assert_eq!(
            indexer.working_dir,
            Some(PathBuf::from("expr/ultradoman/cardiology"))
        );
        assert_eq!(
            IndexerConfig::default().working_dir_for(DEFAULT_CLASS),
            PathBuf::from("expr/ultradoman/sample")
        );
    }

    #[test]
    fn test_explicit_working_dir_wins_over_class() {
        let mut config = Config::from_yaml("indexer:\n  working_dir: /data/index\n").unwrap();
        config.indexer = config.indexer.for_class("cardiology");
        assert_eq!(config.indexer.working_dir, Some(PathBuf::from("/data/index")));

        let mut config = Config::default();
        config.apply_env(|key| (key == "RAG_WORKING_DIR").then(|| "/tmp/rag".to_string()));
        assert_eq!(
            config.indexer.for_class("cardiology").working_dir_for("cardiology"),
            PathBuf::from("/tmp/rag")
        );
    }

    #[test]
    fn test_api_key_read_from_file() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("key.txt");
        std::fs::write(&key_path, "  sk-test-123\n").unwrap();

        let mut llm = LlmConfig {
            api_key_file: Some(key_path),
            ..Default::default()
        };
        llm.resolve_api_key().unwrap();
        assert_eq!(llm.api_key, "sk-test-123");
    }

    #[test]
    fn test_explicit_key_wins_over_file() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("key.txt");
        std::fs::write(&key_path, "from-file").unwrap();

        let mut llm = LlmConfig {
            api_key: "explicit".to_string(),
            api_key_file: Some(key_path),
            ..Default::default()
        };
        llm.resolve_api_key().unwrap();
        assert_eq!(llm.api_key, "explicit");
    }

    #[test]
    fn test_missing_key_file_is_left_to_validate() {
        let mut llm = LlmConfig {
            api_key_file: Some(PathBuf::from("/nonexistent/key.txt")),
            ..Default::default()
        };
        assert!(llm.resolve_api_key().is_ok());
        assert!(llm.api_key.is_empty());
    }

    #[test]
    fn test_validate_indexer_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate_indexer().is_err());
    }
}
