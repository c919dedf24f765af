use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::embedding::SUPPORTED_MODELS;
use crate::error::{FoodcheckError, Result, ValidationError};
use crate::retrieval::RetrievalStrategy;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_corpus(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_sources(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FoodcheckError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_corpus(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked when the corpus is loaded, so a missing
        // directory surfaces as CorpusUnavailable rather than a config error.
        if config.corpus.dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "corpus.dir",
                "Corpus directory cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.max_chunks == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_chunks",
                "max_chunks must be at least 1",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        // Only enforced when the model is actually used
        if config.retrieval.strategy == RetrievalStrategy::Embedding
            && !SUPPORTED_MODELS.contains(&config.embedding.model.as_str())
        {
            errors.push(ValidationError::new(
                "embedding.model",
                format!(
                    "Model must be one of {:?}, got '{}'",
                    SUPPORTED_MODELS, config.embedding.model
                ),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        let valid_providers = ["gemini"];
        if !valid_providers.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    valid_providers, provider
                ),
            ));
        }

        if config.llm.model.trim().is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        if config.llm.api_key_env.trim().is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key variable name cannot be empty",
            ));
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if parse_duration(&config.llm.quota_cooldown).is_none() {
            errors.push(ValidationError::new(
                "llm.quota_cooldown",
                format!("Invalid duration format: {}", config.llm.quota_cooldown),
            ));
        }

        match parse_duration(&config.llm.request_timeout) {
            Some(timeout) if !timeout.is_zero() => {}
            _ => errors.push(ValidationError::new(
                "llm.request_timeout",
                format!("Invalid duration format: {}", config.llm.request_timeout),
            )),
        }
    }

    fn validate_sources(config: &Config, errors: &mut Vec<ValidationError>) {
        for (id, label) in &config.sources {
            if label.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("sources.{}", id),
                    "Authority label cannot be empty",
                ));
            }
        }
    }
}
