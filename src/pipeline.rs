//! End-to-end analysis of one food log
//!
//! `Retriever` covers the offline half (corpus, selection, prompt) so it can
//! be used without a completion service. `Analyzer` adds the model call and
//! response validation on top.

use crate::analysis::{AnalysisResult, ResponseValidator, ScoreBand};
use crate::config::Config;
use crate::corpus::DocumentStore;
use crate::embedding::{FastEmbedProvider, IndexCache};
use crate::error::{FoodcheckError, Result};
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::prompt::{OutputContract, Prompt, PromptAssembler, SourceLabelMap};
use crate::retrieval::{
    EmbeddingSelector, LexicalSelector, RelevanceSelector, RetrievalStrategy, ScoredChunk,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

/// One food log to analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub food_log: String,
    /// Overrides the configured chunk budget for this request only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunks: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(food_log: impl Into<String>) -> Self {
        Self {
            food_log: food_log.into(),
            max_chunks: None,
        }
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }

    /// Reject logs that would waste a completion call
    pub fn validate(&self) -> Result<()> {
        if self.food_log.trim().is_empty() {
            return Err(FoodcheckError::EmptyFoodLog);
        }
        if self.max_chunks == Some(0) {
            return Err(FoodcheckError::InvalidArgument(
                "max_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Selected evidence and the prompt built from it
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPrompt {
    pub selected: Vec<ScoredChunk>,
    pub prompt: Prompt,
}

/// Validated result plus the context it was produced in
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub strategy: RetrievalStrategy,
    pub contract: OutputContract,
    pub model: String,
    /// Chunk ids that were placed in the prompt, in selection order
    pub selected_sources: Vec<String>,
    pub band: ScoreBand,
    pub result: AnalysisResult,
}

/// Corpus loading, relevance selection and prompt assembly
pub struct Retriever {
    store: Arc<DocumentStore>,
    selector: Arc<dyn RelevanceSelector>,
    strategy: RetrievalStrategy,
    assembler: PromptAssembler,
    max_chunks: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<DocumentStore>,
        selector: Arc<dyn RelevanceSelector>,
        strategy: RetrievalStrategy,
        assembler: PromptAssembler,
        max_chunks: usize,
    ) -> Self {
        Self {
            store,
            selector,
            strategy,
            assembler,
            max_chunks,
        }
    }

    /// Build from configuration. The embedding strategy loads its model here.
    pub fn from_config(config: &Config) -> Result<Self> {
        let labels = Arc::new(config.source_labels());
        let store = Arc::new(DocumentStore::new(config.corpus.dir.clone()));
        let selector = build_selector(config)?;
        let assembler = PromptAssembler::new(labels, config.output.contract);

        Ok(Self::new(
            store,
            selector,
            config.retrieval.strategy,
            assembler,
            config.retrieval.max_chunks,
        ))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn strategy(&self) -> RetrievalStrategy {
        self.strategy
    }

    pub fn contract(&self) -> OutputContract {
        self.assembler.contract()
    }

    pub fn labels(&self) -> &Arc<SourceLabelMap> {
        self.assembler.labels()
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Rank the corpus against a food log
    pub fn retrieve(&self, food_log: &str, max_chunks: usize) -> Result<Vec<ScoredChunk>> {
        let corpus = self.store.load()?;
        let ranked = self
            .selector
            .rank(food_log, corpus.chunks(), max_chunks)?;
        debug!(
            "{} selector picked {} of {} chunks",
            self.selector.name(),
            ranked.len(),
            corpus.len()
        );
        Ok(ranked)
    }

    /// Select evidence and assemble the prompt, without calling the model
    pub fn prepare(&self, request: &AnalysisRequest) -> Result<PreparedPrompt> {
        request.validate()?;
        let max_chunks = request.max_chunks.unwrap_or(self.max_chunks);
        let selected = self.retrieve(&request.food_log, max_chunks)?;
        let chunks: Vec<_> = selected.iter().map(|s| s.chunk.clone()).collect();
        let prompt = self.assembler.assemble(&request.food_log, &chunks);
        Ok(PreparedPrompt { selected, prompt })
    }
}

/// Full pipeline: retrieval, completion and validation
pub struct Analyzer<C: CompletionProvider> {
    retriever: Arc<Retriever>,
    validator: ResponseValidator,
    completion: C,
    temperature: f32,
}

impl<C: CompletionProvider> Analyzer<C> {
    pub fn new(retriever: Retriever, completion: C) -> Self {
        let validator = ResponseValidator::new(Arc::clone(retriever.labels()), retriever.contract());
        Self {
            retriever: Arc::new(retriever),
            validator,
            completion,
            temperature: 0.3,
        }
    }

    pub fn from_config(config: &Config, completion: C) -> Result<Self> {
        let retriever = Retriever::from_config(config)?;
        Ok(Self::new(retriever, completion).with_temperature(config.llm.temperature))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Analyze one food log end to end
    ///
    /// Each call is independent. Errors are returned unchanged; nothing is
    /// retried here.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze", %request_id);
        self.run(request_id, request).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, request: &AnalysisRequest) -> Result<AnalysisReport> {
        request.validate()?;

        // Corpus reads and local embedding are blocking work
        let retriever = Arc::clone(&self.retriever);
        let owned = request.clone();
        let prepared = tokio::task::spawn_blocking(move || retriever.prepare(&owned))
            .await
            .map_err(|e| FoodcheckError::Other(anyhow::anyhow!("Retrieval task failed: {}", e)))??;

        if !prepared.prompt.has_evidence() {
            info!("No guideline chunks matched; asking for an ungrounded empty assessment");
        }

        let completion_request = CompletionRequest {
            system: prepared.prompt.system.clone(),
            user: prepared.prompt.user.clone(),
            temperature: self.temperature,
        };
        let raw = self.completion.complete(&completion_request).await?;
        debug!("Received {} bytes from {}", raw.len(), self.completion.model_name());

        let result = self.validator.validate(&raw, &prepared.prompt.source_ids)?;
        info!(
            "Scored {} ({}), {} of {} sources cited",
            result.overall_score,
            result.band(),
            result.sources.len(),
            prepared.prompt.source_ids.len()
        );

        Ok(AnalysisReport {
            request_id,
            analyzed_at: Utc::now(),
            strategy: self.retriever.strategy(),
            contract: self.validator.contract(),
            model: self.completion.model_name().to_string(),
            selected_sources: prepared.prompt.source_ids,
            band: result.band(),
            result,
        })
    }
}

/// Selector for the configured strategy
pub fn build_selector(config: &Config) -> Result<Arc<dyn RelevanceSelector>> {
    match config.retrieval.strategy {
        RetrievalStrategy::Lexical => Ok(Arc::new(LexicalSelector::new())),
        RetrievalStrategy::Embedding => {
            let provider = Arc::new(FastEmbedProvider::new(
                &config.embedding.model,
                config.embedding.batch_size,
            )?);
            let selector = if config.embedding.cache_index {
                EmbeddingSelector::with_cache(provider, Arc::new(IndexCache::new()))
            } else {
                EmbeddingSelector::new(provider)
            };
            Ok(Arc::new(selector))
        }
    }
}
