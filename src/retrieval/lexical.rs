//! Lexical overlap selection

use crate::corpus::Chunk;
use crate::error::Result;
use crate::retrieval::{deduplicate_chunks, ensure_max_chunks, Relevance, RelevanceSelector, ScoredChunk};
use tracing::debug;

/// Function words that would otherwise match nearly every document as substrings
const STOPWORDS: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "are", "as", "at", "be", "but", "by", "did", "do",
    "for", "from", "had", "has", "have", "i", "i'm", "in", "is", "it", "its", "just", "lot",
    "lots", "me", "my", "of", "on", "or", "so", "some", "that", "the", "then", "this", "to",
    "too", "was", "we", "were", "with",
];

/// Ranks chunks by how many food log tokens occur in their text
///
/// The food log is split on whitespace, lowercased, trimmed of surrounding
/// punctuation and stripped of stopwords. A chunk scores one point for every
/// remaining token (repeats included) that appears as a substring of its
/// lowercased content. Zero-score chunks are dropped; equal scores keep
/// corpus order. Works fully offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSelector;

impl LexicalSelector {
    pub fn new() -> Self {
        Self
    }

    /// Query tokens of a food log
    pub fn tokenize(food_log: &str) -> Vec<String> {
        food_log
            .split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| c.is_ascii_punctuation())
                    .to_lowercase()
            })
            .filter(|token| !token.is_empty() && !STOPWORDS.contains(&token.as_str()))
            .collect()
    }

    /// Number of tokens found in `content`, counting repeated tokens each time
    pub fn score(tokens: &[String], content: &str) -> usize {
        let content = content.to_lowercase();
        tokens
            .iter()
            .filter(|token| content.contains(token.as_str()))
            .count()
    }
}

impl RelevanceSelector for LexicalSelector {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn rank(
        &self,
        food_log: &str,
        chunks: &[Chunk],
        max_chunks: usize,
    ) -> Result<Vec<ScoredChunk>> {
        ensure_max_chunks(max_chunks)?;

        let tokens = Self::tokenize(food_log);
        if tokens.is_empty() {
            debug!("Food log has no content tokens, nothing to match");
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, ScoredChunk)> = chunks
            .iter()
            .filter_map(|chunk| {
                let score = Self::score(&tokens, &chunk.content);
                debug!("Lexical score {} for {}", score, chunk.id);
                (score > 0)
                    .then(|| (score, ScoredChunk::new(chunk.clone(), Relevance::Matches(score))))
            })
            .collect();

        // sort_by_key is stable: ties keep corpus enumeration order
        scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));

        let mut ranked = deduplicate_chunks(scored.into_iter().map(|(_, s)| s).collect());
        ranked.truncate(max_chunks);
        Ok(ranked)
    }
}
