// Embeddings and generation module
// Wraps the local Ollama instance: embedding of chunk texts and queries,
// plus the final answer generation.

pub mod ollama;

pub use ollama::{EmbeddingResult, OllamaClient};
