use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::pipeline::{RagPipeline, error_payload, save_response};

/// Index an installation-config document into the vector store.
#[inline]
pub async fn index_document(path: &Path) -> Result<()> {
    info!("Indexing installation document: {}", path.display());

    let config = Config::load().context("Failed to load configuration")?;
    let mut pipeline = RagPipeline::new(config).await?;

    pipeline
        .health_check()
        .context("Ollama unreachable - start the service first")?;

    let stats = pipeline.index_document(path).await?;

    println!("Indexing completed successfully!");
    println!("  Chunks built: {}", stats.chunks_built);
    println!("  Chunks indexed: {}", stats.chunks_indexed);
    println!("  Device families: {}", stats.device_families);
    if stats.chunks_skipped > 0 {
        println!(
            "  Chunks skipped (embedding failures): {}",
            stats.chunks_skipped
        );
    }

    Ok(())
}

/// Answer one query against the indexed document. Failures are reported as
/// a structured JSON payload rather than a crash.
#[inline]
pub async fn ask(query: &str) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let outcome = run_query(&config, query).await;
    match outcome {
        Ok(response) => {
            println!("{}", response.response);
            match save_response(&config, &response) {
                Ok(path) => println!("\nResponse saved to: {}", path.display()),
                Err(e) => eprintln!("Warning: could not save response: {e:#}"),
            }
        }
        Err(e) => {
            println!("{}", error_payload(query, &e));
        }
    }

    Ok(())
}

async fn run_query(config: &Config, query: &str) -> Result<crate::pipeline::RagResponse> {
    let pipeline = RagPipeline::new(config.clone()).await?;
    pipeline
        .health_check()
        .context("Ollama unreachable - start the service first")?;
    pipeline.ask(query).await
}

/// Show pipeline status: configuration summary and index size.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("Ollama: http://{}:{}", config.ollama.host, config.ollama.port);
    println!("  Embedding model: {}", config.ollama.embedding_model);
    println!("  Chat model: {}", config.ollama.chat_model);
    println!("Chunking: max {} bytes per chunk", config.chunking.max_chunk_size);
    println!("Retrieval: top {} candidates", config.retrieval.k);

    match config.vector_db_path() {
        Ok(path) => println!("Vector index: {}", path.display()),
        Err(e) => println!("Vector index: unavailable ({e})"),
    }

    let pipeline = RagPipeline::new(config).await?;
    let count = pipeline.indexed_chunks().await?;
    println!("Indexed chunks: {count}");

    Ok(())
}
