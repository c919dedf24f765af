//! Embedding similarity selection

use crate::corpus::{self, Chunk};
use crate::embedding::{EmbeddingProvider, FlatIndex, IndexCache, IndexKey};
use crate::error::Result;
use crate::retrieval::{deduplicate_chunks, ensure_max_chunks, Relevance, RelevanceSelector, ScoredChunk};
use std::sync::Arc;
use tracing::{debug, info};

/// Ranks chunks by L2 distance between their embeddings and the food log's
///
/// There is no similarity floor: the `max_chunks` nearest chunks are returned
/// even when they are only weakly related to the log.
pub struct EmbeddingSelector {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Option<Arc<IndexCache>>,
}

impl EmbeddingSelector {
    /// Selector that re-embeds the corpus on every call
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            cache: None,
        }
    }

    /// Selector that reuses built indexes while the corpus content is unchanged
    pub fn with_cache(provider: Arc<dyn EmbeddingProvider>, cache: Arc<IndexCache>) -> Self {
        Self {
            provider,
            cache: Some(cache),
        }
    }

    fn build_index(&self, chunks: &[Chunk]) -> Result<FlatIndex> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts)?;
        info!(
            "Embedded {} chunks with {}",
            embeddings.len(),
            self.provider.model_name()
        );
        Ok(FlatIndex::build(&embeddings)?)
    }

    fn index_for(&self, chunks: &[Chunk]) -> Result<Arc<FlatIndex>> {
        match &self.cache {
            Some(cache) => {
                let key = IndexKey::new(corpus::fingerprint(chunks), self.provider.model_name());
                cache.get_or_try_build(key, || self.build_index(chunks))
            }
            None => Ok(Arc::new(self.build_index(chunks)?)),
        }
    }
}

impl RelevanceSelector for EmbeddingSelector {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn rank(
        &self,
        food_log: &str,
        chunks: &[Chunk],
        max_chunks: usize,
    ) -> Result<Vec<ScoredChunk>> {
        ensure_max_chunks(max_chunks)?;

        if chunks.is_empty() || food_log.trim().is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index_for(chunks)?;
        let query = self.provider.embed(food_log)?;
        let neighbors = index.search(&query, max_chunks)?;

        let ranked = neighbors
            .into_iter()
            .filter_map(|n| {
                let chunk = chunks.get(n.position)?;
                debug!("Distance {:.4} for {}", n.distance, chunk.id);
                Some(ScoredChunk::new(chunk.clone(), Relevance::Distance(n.distance)))
            })
            .collect();

        Ok(deduplicate_chunks(ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::error::FoodcheckError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps text to [has "sugar", has "vegetable"] so distances are predictable
    struct KeywordEmbedder {
        batch_calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                batch_calls: AtomicUsize::new(0),
            }
        }

        fn vector(text: &str) -> Vec<f32> {
            let text = text.to_lowercase();
            vec![
                if text.contains("sugar") { 1.0 } else { 0.0 },
                if text.contains("vegetable") { 1.0 } else { 0.0 },
            ]
        }
    }

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Ok(Self::vector(text))
        }

        fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "keyword-test"
        }
    }

    struct OfflineEmbedder;

    impl EmbeddingProvider for OfflineEmbedder {
        fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::GenerationError("offline".to_string()))
        }

        fn embed_batch(&self, _texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::GenerationError("offline".to_string()))
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "offline"
        }
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            Chunk::new("veg.txt", "Eat vegetables daily"),
            Chunk::new("sugar.txt", "Limit free sugar"),
            Chunk::new("both.txt", "Swap sugar snacks for vegetable sticks"),
        ]
    }

    #[test]
    fn test_nearest_first_without_floor() {
        let selector = EmbeddingSelector::new(Arc::new(KeywordEmbedder::new()));
        let ranked = selector.rank("too much sugar", &corpus(), 3).unwrap();

        let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["sugar.txt", "both.txt", "veg.txt"]);

        let distances: Vec<f32> = ranked
            .iter()
            .map(|s| match s.relevance {
                Relevance::Distance(d) => d,
                Relevance::Matches(_) => panic!("expected distance"),
            })
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_respects_max_chunks() {
        let selector = EmbeddingSelector::new(Arc::new(KeywordEmbedder::new()));
        let selected = selector.select("vegetable soup", &corpus(), 1).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "veg.txt");
    }

    #[test]
    fn test_cache_reuses_index() {
        let provider = Arc::new(KeywordEmbedder::new());
        let selector = EmbeddingSelector::with_cache(provider.clone(), Arc::new(IndexCache::new()));

        selector.rank("sugar", &corpus(), 2).unwrap();
        selector.rank("vegetables", &corpus(), 2).unwrap();
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 1);

        let mut changed = corpus();
        changed.push(Chunk::new("new.txt", "Drink water"));
        selector.rank("sugar", &changed, 2).unwrap();
        assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_embedding_failure_is_retryable() {
        let selector = EmbeddingSelector::new(Arc::new(OfflineEmbedder));
        let err = selector.rank("sugar", &corpus(), 2).unwrap_err();
        assert!(matches!(err, FoodcheckError::EmbeddingService(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_corpus() {
        let selector = EmbeddingSelector::new(Arc::new(OfflineEmbedder));
        assert!(selector.rank("sugar", &[], 2).unwrap().is_empty());
    }
}
