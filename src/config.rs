//! Configuration management for leifinder
//!
//! All configuration is loaded from `./config/leifinder.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ranker::RankingParams;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/leifinder.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/leifinder.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' is out of range: {detail}")]
    OutOfRange { field: String, detail: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub extraction: ExtractionConfig,
    pub registry: RegistryConfig,
    pub llm: LlmConfig,
    pub ranking: RankingConfig,
}

/// HTTP client configuration for page fetches
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

/// HTML extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub max_emails: usize,
    pub max_phones: usize,
    /// Ask the LLM collaborator for hints during extraction
    pub llm_enabled: bool,
}

/// LEI registry lookup configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub max_candidates: usize,
}

/// LLM collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key, read at client build time
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Jurisdiction-bias detection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    pub dominant_jurisdiction: String,
    pub bias_threshold: f64,
    pub multinational_min_jurisdictions: usize,
}

impl RankingConfig {
    pub fn to_params(&self) -> RankingParams {
        RankingParams {
            dominant_jurisdiction: self.dominant_jurisdiction.clone(),
            bias_threshold: self.bias_threshold,
            multinational_min_jurisdictions: self.multinational_min_jurisdictions,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "http.user_agent".to_string(),
            });
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "http.request_timeout_secs".to_string(),
            });
        }

        if !self.registry.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl {
                field: "registry.endpoint".to_string(),
                url: self.registry.endpoint.clone(),
            });
        }
        if self.registry.max_candidates == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "registry.max_candidates".to_string(),
            });
        }

        if !self.llm.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl {
                field: "llm.endpoint".to_string(),
                url: self.llm.endpoint.clone(),
            });
        }
        if self.llm.model.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "llm.model".to_string(),
            });
        }

        if self.ranking.dominant_jurisdiction.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "ranking.dominant_jurisdiction".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.ranking.bias_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "ranking.bias_threshold".to_string(),
                detail: format!(
                    "{} (expected a fraction in [0, 1])",
                    self.ranking.bias_threshold
                ),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
