
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig, ProviderKind};
use crate::embeddings::ollama::OllamaClient;
use crate::index::Metric;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 FAQ Search Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Knowledge Base").bold().yellow());
    eprintln!("Where the FAQ dataset lives and where the built index is stored.");
    eprintln!();

    configure_paths(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Embeddings").bold().yellow());
    configure_embedding(&mut config)?;

    if config.embedding.provider == ProviderKind::Ollama {
        eprintln!();
        configure_ollama(&mut config.ollama)?;

        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.ollama) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before building the index.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!("  Dataset: {}", style(config.paths.dataset.display()).cyan());
    eprintln!("  Index: {}", style(config.paths.index.display()).cyan());

    eprintln!();
    eprintln!("{}", style("Embeddings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());

    if config.embedding.provider == ProviderKind::Ollama {
        eprintln!();
        eprintln!("{}", style("Ollama Settings:").bold().yellow());
        eprintln!("  Model: {}", style(&config.ollama.model).cyan());
        eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
        eprintln!("  Timeout: {}s", style(config.ollama.timeout_secs).cyan());
        match config.ollama_url() {
            Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
            Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
        }
    }

    eprintln!();
    eprintln!("{}", style("Search:").bold().yellow());
    eprintln!("  Metric: {}", style(config.search.metric).cyan());
    eprintln!("  Default top_k: {}", style(config.search.default_top_k).cyan());
    match config.search.min_score {
        Some(min_score) => eprintln!("  Minimum score: {}", style(min_score).cyan()),
        None => eprintln!("  Minimum score: {}", style("none").dim()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_paths(config: &mut Config) -> Result<()> {
    let dataset: String = Input::new()
        .with_prompt("FAQ dataset (JSON)")
        .default(config.paths.dataset.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Dataset path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let index: String = Input::new()
        .with_prompt("Index directory")
        .default(config.paths.index.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Index path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.paths.dataset = PathBuf::from(dataset.trim());
    config.paths.index = PathBuf::from(index.trim());
    Ok(())
}

fn configure_embedding(config: &mut Config) -> Result<()> {
    let providers = [ProviderKind::Ollama, ProviderKind::Hashing];
    let labels = ["ollama (remote model)", "hashing (local, deterministic)"];
    let default_index = providers
        .iter()
        .position(|&p| p == config.embedding.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&labels)
        .interact()?;
    config.embedding.provider = providers[provider_index];

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(config.embedding.dimension)
        .validate_with(|input: &u32| -> Result<(), ConfigError> {
            if (8..=4096).contains(input) {
                Ok(())
            } else {
                Err(ConfigError::InvalidEmbeddingDimension(*input))
            }
        })
        .interact_text()?;
    config.embedding.dimension = dimension;

    let metrics = [Metric::Cosine, Metric::InnerProduct];
    let metric_labels = ["cosine", "inner_product"];
    let default_metric = metrics
        .iter()
        .position(|&m| m == config.search.metric)
        .unwrap_or(0);
    let metric_index = Select::new()
        .with_prompt("Similarity metric")
        .default(default_metric)
        .items(&metric_labels)
        .interact()?;
    config.search.metric = metrics[metric_index];

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| {
            client
                .with_timeout(Duration::from_secs(5))
                .with_retry_attempts(1)
                .ping()
                .is_ok()
        })
        .unwrap_or(false)
}
