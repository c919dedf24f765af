/// Embedding & Vector Index
///
/// Architecture:
/// - EmbeddingProvider trait over the embedding service
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - FlatIndex for exact L2 nearest-neighbour search over chunk embeddings
/// - IndexCache so an unchanged corpus is embedded once per process
mod cache;
mod provider;
mod vector_index;

pub use cache::{IndexCache, IndexKey};
pub use provider::{
    EmbeddingError, EmbeddingProvider, FastEmbedProvider, DEFAULT_MODEL, SUPPORTED_MODELS,
};
pub use vector_index::{FlatIndex, Neighbor, VectorIndexError};
