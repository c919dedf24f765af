//! Ranked chunk structures

use crate::corpus::Chunk;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How relevant a chunk was judged to be, in the strategy's own units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Relevance {
    /// Lexical strategy: number of query tokens found in the chunk (higher is better)
    Matches(usize),
    /// Embedding strategy: L2 distance to the query vector (lower is better)
    Distance(f32),
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relevance::Matches(n) => write!(f, "{} matches", n),
            Relevance::Distance(d) => write!(f, "distance {:.4}", d),
        }
    }
}

/// A chunk with its relevance for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub relevance: Relevance,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, relevance: Relevance) -> Self {
        Self { chunk, relevance }
    }

    /// Get a short preview of the text (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        let text = self.chunk.content.trim();
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}
