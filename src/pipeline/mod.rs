// Pipeline orchestration
// End to end: load the installation document, build and post-process
// chunks, embed and index them, then answer queries through retrieval,
// adaptive filtering, context formatting and the chat model.


use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::Chunk;
use crate::chunk::builder::build_chunks;
use crate::chunk::postprocess::process_chunks;
use crate::config::Config;
use crate::context::format_context;
use crate::database::{EmbeddingRecord, VectorStore};
use crate::embeddings::OllamaClient;
use crate::loader::{LoadOutcome, load_installation};
use crate::query::{analyze_query, filter_documents};

/// Outcome of indexing one installation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub chunks_built: usize,
    pub chunks_indexed: usize,
    pub chunks_skipped: usize,
    pub device_families: usize,
}

/// One answered query.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub response: String,
    pub timestamp: String,
}

pub struct RagPipeline {
    config: Config,
    ollama: OllamaClient,
    vector_store: VectorStore,
}

impl RagPipeline {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let ollama = OllamaClient::new(&config).context("Failed to initialize Ollama client")?;
        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to initialize LanceDB vector store")?;

        Ok(Self {
            config,
            ollama,
            vector_store,
        })
    }

    /// Verify the embedding/LLM service is reachable before doing work.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        self.ollama.health_check()
    }

    /// Load, chunk, embed and index one installation document. Replaces any
    /// previously indexed content.
    #[inline]
    pub async fn index_document(&mut self, path: &Path) -> Result<IndexStats> {
        let chunks = match load_installation(path)? {
            LoadOutcome::Loaded {
                installation,
                partition_map,
            } => {
                let source = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                build_chunks(&installation, &partition_map, &source)
            }
            LoadOutcome::Fallback(chunk) => {
                warn!("document degraded to a single fallback chunk");
                vec![chunk]
            }
        };
        let chunks_built = chunks.len();

        let processed = process_chunks(chunks, self.config.chunking.max_chunk_size);
        let device_families = processed.device_families.len();
        info!(
            "prepared {} chunks in {} device families",
            processed.chunks.len(),
            device_families
        );

        let (records, chunks_skipped) = self.embed_chunks(&processed.chunks);

        self.vector_store
            .reset()
            .await
            .context("Failed to reset vector store")?;
        let chunks_indexed = records.len();
        self.vector_store
            .store_embeddings_batch(records)
            .await
            .context("Failed to store embeddings")?;

        Ok(IndexStats {
            chunks_built,
            chunks_indexed,
            chunks_skipped,
            device_families,
        })
    }

    /// Embed every chunk text. A failing batch is retried per chunk and an
    /// individual failure skips that chunk only.
    fn embed_chunks(&self, chunks: &[Chunk]) -> (Vec<EmbeddingRecord>, usize) {
        let progress = ProgressBar::new(chunks.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Embedding chunks");

        let mut records = Vec::with_capacity(chunks.len());
        let mut skipped = 0usize;

        let batch_size = self.config.ollama.batch_size as usize;
        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            match self.ollama.embed_batch(&texts) {
                Ok(results) => {
                    for (chunk, result) in batch.iter().zip(results) {
                        records.push(EmbeddingRecord {
                            id: Uuid::new_v4().to_string(),
                            vector: result.embedding,
                            chunk: chunk.clone(),
                        });
                    }
                    progress.inc(batch.len() as u64);
                }
                Err(batch_error) => {
                    warn!("batch embedding failed, retrying chunks individually: {batch_error:#}");
                    for chunk in batch {
                        match self.ollama.embed_query(&chunk.content) {
                            Ok(result) => records.push(EmbeddingRecord {
                                id: Uuid::new_v4().to_string(),
                                vector: result.embedding,
                                chunk: chunk.clone(),
                            }),
                            Err(e) => {
                                warn!(
                                    "skipping chunk {:?}: embedding failed: {e:#}",
                                    chunk.metadata.name
                                );
                                skipped += 1;
                            }
                        }
                        progress.inc(1);
                    }
                }
            }
        }

        progress.finish_and_clear();
        (records, skipped)
    }

    /// Answer one query from the indexed document.
    #[inline]
    pub async fn ask(&self, query: &str) -> Result<RagResponse> {
        if query.trim().len() < 3 {
            return Err(anyhow::anyhow!(
                "Invalid query: a non-empty string is required"
            ));
        }

        let query_embedding = self
            .ollama
            .embed_query(query)
            .context("Failed to embed query")?;

        let candidates = self
            .vector_store
            .search_similar(&query_embedding.embedding, self.config.retrieval.k)
            .await
            .context("Similarity search failed")?;
        info!("retriever returned {} candidate documents", candidates.len());

        let docs: Vec<Chunk> = candidates.into_iter().map(|r| r.chunk).collect();

        let analysis = analyze_query(query);
        let filtered = filter_documents(&analysis, docs);
        info!("{} documents selected for the context", filtered.len());

        let context = format_context(&filtered, query);
        let prompt = build_prompt(&context, query);

        let response = self
            .ollama
            .generate(&prompt)
            .context("LLM invocation failed")?;

        Ok(RagResponse {
            query: query.to_string(),
            response,
            timestamp: Utc::now().to_rfc3339(),
        })
    }

    /// Number of chunks currently indexed.
    #[inline]
    pub async fn indexed_chunks(&self) -> Result<u64> {
        Ok(self.vector_store.count_embeddings().await?)
    }
}

/// Render the QA prompt: the model answers strictly from the supplied
/// context.
#[inline]
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an assistant specialized in the analysis of home automation systems. \
Your task is to provide accurate information based solely on the data provided in the context.

USE EXCLUSIVELY THE DATA PROVIDED IN THE GIVEN CONTEXT.
DO NOT ADD INFORMATION BASED ON GENERAL KNOWLEDGE OR DEDUCTIONS.
ALWAYS STATE WHEN INFORMATION IS NOT AVAILABLE IN THE DATA.

The context uses a hierarchical numbering system:
- Chunks with ID \"0\" are PARENT DEVICES
- Chunks with ID \"0.1\", \"0.2\", ... are PARAMETERS of parent devices
- Always group parameters under their parent device, never list them as separate devices

AVAILABLE DEVICES CONTEXT

{context}

USER REQUEST

{query}

Before answering, verify that every piece of information you mention is literally present \
in the context. If the requested device is not present, say so and list the devices that \
are available. Conclude by noting that the analysis is based only on the currently \
available data.

Response:"
    )
}

/// Persist an answered query as a timestamped file in the configured output
/// directory.
#[inline]
pub fn save_response(config: &Config, response: &RagResponse) -> Result<PathBuf> {
    let responses_dir = config
        .responses_dir()
        .context("Failed to resolve responses directory")?;
    fs::create_dir_all(&responses_dir).with_context(|| {
        format!(
            "Failed to create responses directory: {}",
            responses_dir.display()
        )
    })?;

    let timestamp = response.timestamp.replace([':', '.'], "-");
    let path = responses_dir.join(format!("response_{timestamp}.json"));

    let serialized = serde_json::to_string_pretty(response)
        .context("Failed to serialize response")?;
    fs::write(&path, serialized)
        .with_context(|| format!("Failed to write response file: {}", path.display()))?;

    info!("response saved to {}", path.display());
    Ok(path)
}

/// Structured error payload returned to the caller instead of a crash.
#[inline]
pub fn error_payload(query: &str, error: &anyhow::Error) -> String {
    serde_json::to_string_pretty(&json!({
        "response": "An error occurred while processing your request.",
        "error": format!("{error:#}"),
        "query": query,
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .unwrap_or_else(|_| format!("Error: {error:#}"))
}
