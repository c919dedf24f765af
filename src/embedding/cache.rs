//! Built-index cache keyed by corpus content and embedding model
use super::FlatIndex;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Identifies one built index: which corpus content, embedded by which model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub corpus_hash: String,
    pub model: String,
}

impl IndexKey {
    pub fn new(corpus_hash: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            corpus_hash: corpus_hash.into(),
            model: model.into(),
        }
    }
}

/// Shared cache of built indexes
///
/// A changed corpus produces a different content hash and therefore a miss,
/// so stale entries are never served. Each model keeps only the index for the
/// most recent corpus it was built against, so the cache holds at most one
/// entry per model. `invalidate` drops everything.
#[derive(Default)]
pub struct IndexCache {
    entries: RwLock<AHashMap<IndexKey, Arc<FlatIndex>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &IndexKey) -> Option<Arc<FlatIndex>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: IndexKey, index: Arc<FlatIndex>) {
        debug!(
            "Caching index for corpus {} / model {} ({} vectors)",
            key.corpus_hash,
            key.model,
            index.len()
        );
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|existing, _| existing.model != key.model);
        entries.insert(key, index);
    }

    /// Return the cached index, building and storing it on a miss
    pub fn get_or_try_build<E>(
        &self,
        key: IndexKey,
        build: impl FnOnce() -> Result<FlatIndex, E>,
    ) -> Result<Arc<FlatIndex>, E> {
        if let Some(index) = self.get(&key) {
            debug!("Index cache hit for corpus {}", key.corpus_hash);
            return Ok(index);
        }

        let index = Arc::new(build()?);
        self.insert(key, Arc::clone(&index));
        Ok(index)
    }

    pub fn invalidate(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
