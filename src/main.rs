use clap::{Parser, Subcommand};
use faq_search::Result;
use faq_search::commands::{
    build_index, list_blocks, list_questions, load_config, search, show_status,
};
use faq_search::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faq-search")]
#[command(about = "Semantic question answering over a curated FAQ dataset")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.faq-search)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure dataset paths, embedding backend and search defaults
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed the dataset and write the index artifact
    Build,
    /// Find the FAQ entries closest to a question
    Search {
        /// Free-text question
        query: String,
        /// Number of results (defaults to the configured value)
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
        /// Only return entries from this block
        #[arg(long)]
        block: Option<String>,
        /// Only return entries carrying this tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List dataset blocks with their entry counts
    Blocks,
    /// List every question in the dataset
    Questions,
    /// Show dataset health and index freshness
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
                show_config(&load_config(cli.config_dir)?)?;
            } else {
                let config_dir = match cli.config_dir {
                    Some(dir) => dir,
                    None => get_config_dir().map_err(anyhow::Error::from)?,
                };
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Build => {
            build_index(load_config(cli.config_dir)?).await?;
        }
        Commands::Search {
            query,
            top_k,
            block,
            tags,
        } => {
            search(load_config(cli.config_dir)?, query, top_k, block, tags).await?;
        }
        Commands::Blocks => {
            list_blocks(&load_config(cli.config_dir)?)?;
        }
        Commands::Questions => {
            list_questions(&load_config(cli.config_dir)?)?;
        }
        Commands::Status => {
            show_status(load_config(cli.config_dir)?).await?;
        }
    }

    Ok(())
}
