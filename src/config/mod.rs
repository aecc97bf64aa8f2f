// Configuration management module
// TOML configuration with validated settings for Ollama, chunking,
// retrieval and storage.

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ChunkingConfig, Config, ConfigError, OllamaConfig, RetrievalConfig, StorageConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
