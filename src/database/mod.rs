// Database module
// LanceDB vector storage for chunk embeddings and similarity search.

pub mod lancedb;

pub use lancedb::{EmbeddingRecord, SearchResult, VectorStore};
