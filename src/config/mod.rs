//! Configuration management for foodcheck
//!
//! Loading, validation, profiles and environment overrides. Everything here
//! is read once at startup and shared read-only afterwards.

use crate::error::{FoodcheckError, Result};
use crate::prompt::{OutputContract, SourceLabelMap};
use crate::retrieval::RetrievalStrategy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
    /// Extra or replacement authority labels, keyed by chunk id
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Guideline corpus location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub dir: PathBuf,
}

/// Relevance selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub strategy: RetrievalStrategy,
    pub max_chunks: usize,
}

/// Embedding settings (embedding strategy only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    /// Keep built indexes for the process lifetime, keyed by corpus hash
    #[serde(default = "default_true")]
    pub cache_index: bool,
}

fn default_true() -> bool {
    true
}

/// Completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    /// How long callers should wait after a quota error, e.g. "30s"
    pub quota_cooldown: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_request_timeout() -> String {
    "60s".to_string()
}

impl LlmConfig {
    pub fn quota_cooldown(&self) -> Result<Duration> {
        parse_duration(&self.quota_cooldown).ok_or_else(|| FoodcheckError::InvalidConfigValue {
            path: "llm.quota_cooldown".to_string(),
            message: format!("Invalid duration: {}", self.quota_cooldown),
        })
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration(&self.request_timeout).ok_or_else(|| FoodcheckError::InvalidConfigValue {
            path: "llm.request_timeout".to_string(),
            message: format!("Invalid duration: {}", self.request_timeout),
        })
    }
}

/// Output contract selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contract: OutputContract,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<RetrievalStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<OutputContract>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FoodcheckError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FoodcheckError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| FoodcheckError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| FoodcheckError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(strategy) = overrides.strategy {
            self.retrieval.strategy = strategy;
        }
        if let Some(max_chunks) = overrides.max_chunks {
            self.retrieval.max_chunks = max_chunks;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(temperature) = overrides.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(contract) = overrides.contract {
            self.output.contract = contract;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: FOODCHECK_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("FOODCHECK_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        let invalid = |message: String| FoodcheckError::InvalidConfigValue {
            path: path.to_string(),
            message,
        };

        match path {
            "CORPUS__DIR" => {
                self.corpus.dir = PathBuf::from(value);
            }
            "RETRIEVAL__STRATEGY" => {
                self.retrieval.strategy = value.parse()?;
            }
            "RETRIEVAL__MAX_CHUNKS" => {
                self.retrieval.max_chunks = value
                    .parse()
                    .map_err(|_| invalid(format!("Cannot parse '{}' as integer", value)))?;
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "LLM__TEMPERATURE" => {
                self.llm.temperature = value
                    .parse()
                    .map_err(|_| invalid(format!("Cannot parse '{}' as number", value)))?;
            }
            "LLM__API_KEY_ENV" => {
                self.llm.api_key_env = value.to_string();
            }
            "OUTPUT__CONTRACT" => {
                self.output.contract = value.parse()?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Authority labels: built-ins with the `[sources]` table layered on top
    pub fn source_labels(&self) -> SourceLabelMap {
        SourceLabelMap::builtin().with_overrides(&self.sources)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            FoodcheckError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("foodcheck").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            corpus: CorpusConfig {
                dir: PathBuf::from("knowledge"),
            },
            retrieval: RetrievalConfig {
                strategy: RetrievalStrategy::Lexical,
                max_chunks: 3,
            },
            embedding: EmbeddingConfig {
                model: crate::embedding::DEFAULT_MODEL.to_string(),
                batch_size: 32,
                cache_index: true,
            },
            llm: LlmConfig {
                provider: "gemini".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                model: "gemini-flash-latest".to_string(),
                temperature: 0.3,
                quota_cooldown: "30s".to_string(),
                request_timeout: default_request_timeout(),
                endpoint: None,
            },
            output: OutputConfig {
                contract: OutputContract::Grounded,
            },
            sources: BTreeMap::new(),
            profiles: HashMap::new(),
        }
    }
}

/// Parse durations like "30s", "2m", "1h", "500ms" or bare seconds
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = digits.parse().ok()?;

    match unit {
        "ms" => Some(Duration::from_millis(value)),
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_deployment() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gemini-flash-latest");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.llm.quota_cooldown().unwrap(), Duration::from_secs(30));
        assert_eq!(config.output.contract, OutputContract::Grounded);
        assert_eq!(config.source_labels().len(), 6);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.strategy = RetrievalStrategy::Embedding;
        config
            .sources
            .insert("nhs_salt.txt".to_string(), "NHS".to_string());
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.strategy, RetrievalStrategy::Embedding);
        assert_eq!(loaded.source_labels().label("nhs_salt.txt"), "NHS");
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(&temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, FoodcheckError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_profile_overrides() {
        let mut config = Config::default();
        config.profiles.insert(
            "offline".to_string(),
            ProfileOverrides {
                strategy: Some(RetrievalStrategy::Lexical),
                max_chunks: Some(5),
                contract: Some(OutputContract::Legacy),
                ..Default::default()
            },
        );

        config.apply_profile("offline").unwrap();
        assert_eq!(config.retrieval.max_chunks, 5);
        assert_eq!(config.output.contract, OutputContract::Legacy);
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_env_style_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vec![
            ("FOODCHECK_RETRIEVAL__STRATEGY".to_string(), "embedding".to_string()),
            ("FOODCHECK_LLM__TEMPERATURE".to_string(), "0.7".to_string()),
            ("FOODCHECK_RETRIEVAL__MAX_CHUNKS".to_string(), "lots".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ]);

        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Embedding);
        assert_eq!(config.llm.temperature, 0.7);
        // Unparsable values are skipped, not applied
        assert_eq!(config.retrieval.max_chunks, 3);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("10d"), None);
    }
}
