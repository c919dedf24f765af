//! Result deduplication by chunk id

use crate::retrieval::ScoredChunk;
use std::collections::HashSet;

/// Deduplicate ranked chunks by id, keeping the first (best ranked) instance
pub fn deduplicate_chunks(chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    let mut seen: HashSet<String> = HashSet::new();

    chunks
        .into_iter()
        .filter(|scored| seen.insert(scored.chunk.id.clone()))
        .collect()
}
