//! Relevance selection
//!
//! Chooses which guideline chunks go into the prompt for a food log. Two
//! strategies share the [`RelevanceSelector`] capability so the prompt and
//! validation stages never depend on which one ran.

mod deduplication;
mod lexical;
mod scored;
mod semantic;

pub use deduplication::deduplicate_chunks;
pub use lexical::LexicalSelector;
pub use scored::{Relevance, ScoredChunk};
pub use semantic::EmbeddingSelector;

use crate::corpus::Chunk;
use crate::error::{FoodcheckError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ranks guideline chunks against a food log
pub trait RelevanceSelector: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &'static str;

    /// At most `max_chunks` distinct chunks from `chunks`, most relevant first
    fn rank(&self, food_log: &str, chunks: &[Chunk], max_chunks: usize)
        -> Result<Vec<ScoredChunk>>;

    /// Same as [`rank`](Self::rank) without the scores
    fn select(&self, food_log: &str, chunks: &[Chunk], max_chunks: usize) -> Result<Vec<Chunk>> {
        Ok(self
            .rank(food_log, chunks, max_chunks)?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }
}

/// Which selector to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    #[default]
    Lexical,
    Embedding,
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => f.write_str("lexical"),
            Self::Embedding => f.write_str("embedding"),
        }
    }
}

impl FromStr for RetrievalStrategy {
    type Err = FoodcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "embedding" => Ok(Self::Embedding),
            other => Err(FoodcheckError::InvalidArgument(format!(
                "Unknown retrieval strategy '{}', expected 'lexical' or 'embedding'",
                other
            ))),
        }
    }
}

pub(crate) fn ensure_max_chunks(max_chunks: usize) -> Result<()> {
    if max_chunks == 0 {
        return Err(FoodcheckError::InvalidArgument(
            "max_chunks must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "Embedding".parse::<RetrievalStrategy>().unwrap(),
            RetrievalStrategy::Embedding
        );
        assert_eq!(RetrievalStrategy::Lexical.to_string(), "lexical");
        assert!("bm25".parse::<RetrievalStrategy>().is_err());
    }

    #[test]
    fn test_selectors_are_interchangeable() {
        let selectors: Vec<Box<dyn RelevanceSelector>> = vec![Box::new(LexicalSelector::new())];
        let chunks = vec![Chunk::new("fiber.txt", "whole grains provide fiber")];
        for selector in selectors {
            let selected = selector.select("grains", &chunks, 1).unwrap();
            assert_eq!(selected.len(), 1, "{}", selector.name());
        }
    }
}
