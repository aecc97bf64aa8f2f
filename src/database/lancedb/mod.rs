// LanceDB vector database module
// Handles vector storage and similarity search for chunk embeddings

pub mod vector_store;

pub use vector_store::VectorStore;

use crate::chunk::Chunk;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding (768 dimensions for nomic-embed-text)
    pub vector: Vec<f32>,
    /// The chunk this embedding represents
    pub chunk: Chunk,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity_score: f32,
    pub distance: f32,
}
