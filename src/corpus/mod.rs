//! Guideline corpus loading
//!
//! Every regular file under the corpus directory becomes one [`Chunk`], keyed
//! by its file name. The corpus is static, so the loaded set is cached for the
//! lifetime of the store.

use crate::error::{FoodcheckError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One retrievable unit of guideline text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier, the source file name (e.g. `who_free_sugars.txt`)
    pub id: String,
    /// Full document text
    pub content: String,
}

impl Chunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Loaded corpus: chunks in enumeration order plus a content fingerprint
#[derive(Debug, Clone)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    content_hash: String,
}

impl Corpus {
    /// Build a corpus from chunks already in memory
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let content_hash = fingerprint(&chunks);
        Self {
            chunks,
            content_hash,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// BLAKE3 hex digest over every chunk id and content
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }
}

/// Read-only document store over a corpus directory
pub struct DocumentStore {
    root: PathBuf,
    cached: RwLock<Option<Arc<Corpus>>>,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the corpus, reading from disk only on the first call
    pub fn load(&self) -> Result<Arc<Corpus>> {
        if let Some(corpus) = self.read_cache().as_ref() {
            return Ok(Arc::clone(corpus));
        }

        let corpus = Arc::new(self.read_corpus()?);

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        // Another reader may have filled the cache meanwhile; both copies are identical.
        Ok(Arc::clone(cached.get_or_insert(corpus)))
    }

    /// Drop the cached corpus so the next `load` re-reads the directory
    pub fn invalidate(&self) {
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Corpus>>> {
        self.cached.read().unwrap_or_else(|e| e.into_inner())
    }

    fn read_corpus(&self) -> Result<Corpus> {
        if !self.root.is_dir() {
            return Err(FoodcheckError::CorpusUnavailable {
                path: self.root.clone(),
                reason: "not a readable directory".to_string(),
            });
        }

        let mut files = Vec::new();
        // Hidden directories (.git, .ipynb_checkpoints) are pruned whole; the root is always walked.
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
        for entry in walker {
            let entry = entry.map_err(|e| FoodcheckError::CorpusUnavailable {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        // Directory iteration order is platform dependent; ranking ties rely on a stable order.
        files.sort();

        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut chunks = Vec::with_capacity(files.len());

        for path in files {
            let Some(id) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                warn!("Skipping corpus file with non UTF-8 name: {:?}", path);
                continue;
            };

            let bytes = std::fs::read(&path).map_err(|e| FoodcheckError::CorpusUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let Ok(content) = String::from_utf8(bytes) else {
                warn!("Skipping non UTF-8 corpus file: {}", path.display());
                continue;
            };

            if content.trim().is_empty() {
                warn!("Skipping empty corpus file: {}", path.display());
                continue;
            }

            if let Some(first) = seen.get(&id) {
                return Err(FoodcheckError::DuplicateChunkId {
                    id,
                    first: first.clone(),
                    second: path,
                });
            }
            seen.insert(id.clone(), path);

            debug!("Loaded chunk {} ({} bytes)", id, content.len());
            chunks.push(Chunk { id, content });
        }

        let corpus = Corpus::from_chunks(chunks);
        info!(
            "Loaded {} guideline chunks from {} (hash {})",
            corpus.len(),
            self.root.display(),
            &corpus.content_hash()[..12]
        );

        Ok(corpus)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// BLAKE3 hex digest identifying a chunk set, order sensitive
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(&(chunk.id.len() as u64).to_le_bytes());
        hasher.update(chunk.id.as_bytes());
        hasher.update(&(chunk.content.len() as u64).to_le_bytes());
        hasher.update(chunk.content.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_hierarchical_corpus() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "who/who_free_sugars.txt", "limit free sugars");
        write(temp.path(), "efsa_fiber.txt", "eat 25g fiber");
        write(temp.path(), ".DS_Store", "junk");

        let store = DocumentStore::new(temp.path());
        let corpus = store.load().unwrap();

        assert_eq!(corpus.len(), 2);
        let ids: Vec<&str> = corpus.chunks().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["efsa_fiber.txt", "who_free_sugars.txt"]);
        assert_eq!(
            corpus.get("who_free_sugars.txt").unwrap().content,
            "limit free sugars"
        );
    }

    #[test]
    fn test_missing_corpus() {
        let temp = TempDir::new().unwrap();
        let store = DocumentStore::new(temp.path().join("nope"));
        let err = store.load().unwrap_err();
        assert!(matches!(err, FoodcheckError::CorpusUnavailable { .. }));
    }

    #[test]
    fn test_load_is_cached_until_invalidated() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "alpha");

        let store = DocumentStore::new(temp.path());
        let first = store.load().unwrap();
        write(temp.path(), "b.txt", "beta");

        let second = store.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);

        store.invalidate();
        let third = store.load().unwrap();
        assert_eq!(third.len(), 2);
        assert_ne!(first.content_hash(), third.content_hash());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "x/notes.txt", "one");
        write(temp.path(), "y/notes.txt", "two");

        let err = DocumentStore::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, FoodcheckError::DuplicateChunkId { .. }));
    }

    #[test]
    fn test_hidden_directories_are_pruned() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "who_free_sugars.txt", "limit free sugars");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main");
        write(
            temp.path(),
            ".ipynb_checkpoints/who_free_sugars.txt",
            "stale checkpoint copy",
        );

        let corpus = DocumentStore::new(temp.path()).load().unwrap();
        let ids: Vec<&str> = corpus.chunks().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["who_free_sugars.txt"]);
        assert_eq!(corpus.chunks()[0].content, "limit free sugars");
    }

    #[test]
    fn test_binary_file_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "efsa_fiber.txt", "eat 25g fiber");
        std::fs::write(temp.path().join("scan.pdf"), [0x25, 0x50, 0xff, 0xfe, 0x00]).unwrap();

        let corpus = DocumentStore::new(temp.path()).load().unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.get("scan.pdf").is_none());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = Corpus::from_chunks(vec![Chunk::new("a.txt", "alpha")]);
        let b = Corpus::from_chunks(vec![Chunk::new("a.txt", "alpha")]);
        let c = Corpus::from_chunks(vec![Chunk::new("a.txt", "alpha!")]);
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
