use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config_qa::Result;
use config_qa::commands::{ask, index_document, show_status};
use config_qa::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "config-qa")]
#[command(about = "Question answering over home-automation installation configs with local RAG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index an installation-config JSON document
    Index {
        /// Path to the installation-config JSON file
        file: PathBuf,
    },
    /// Ask a question about the indexed installation
    Ask {
        /// Natural-language query
        query: String,
    },
    /// Show pipeline status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Index { file } => {
            index_document(&file).await?;
        }
        Commands::Ask { query } => {
            ask(&query).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["config-qa", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn index_command_with_file() {
        let cli = Cli::try_parse_from(["config-qa", "index", "installation-config.json"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Index { file } = parsed.command {
                assert_eq!(file, PathBuf::from("installation-config.json"));
            }
        }
    }

    #[test]
    fn ask_command_with_query() {
        let cli = Cli::try_parse_from(["config-qa", "ask", "Show me devices"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { query } = parsed.command {
                assert_eq!(query, "Show me devices");
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["config-qa", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["config-qa", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["config-qa", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }

    #[test]
    fn ask_requires_a_query() {
        let cli = Cli::try_parse_from(["config-qa", "ask"]);
        assert!(cli.is_err());
    }
}
