use anyhow::{Context, Result};
use itertools::Itertools;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::builder;
use crate::config::{Config, ProviderKind};
use crate::dataset::Dataset;
use crate::embeddings::{OllamaClient, provider_from_config};
use crate::engine::{RetrievalEngine, SearchFilter};

/// Load configuration from `config_dir` (or the default location) and apply
/// environment overrides
#[inline]
pub fn load_config(config_dir: Option<PathBuf>) -> Result<Config> {
    let Some(dir) = config_dir else {
        return Config::load_default();
    };
    let mut config = Config::load(dir)?;
    config.apply_env_overrides();
    Ok(config)
}

/// Embed the whole dataset and persist a fresh index artifact
#[inline]
pub async fn build_index(config: Config) -> Result<()> {
    info!(
        "Building index from {} into {}",
        config.paths.dataset.display(),
        config.paths.index.display()
    );

    let report = spawn_blocking(move || {
        let embedder = provider_from_config(&config)?;
        builder::run(config.engine_config(), embedder)
    })
    .await
    .context("Index build task failed")??;

    println!("✅ Index built");
    println!("   Build ID: {}", report.build_id);
    println!("   Records: {}", report.records_processed);
    if report.duplicates_skipped > 0 {
        println!("   Duplicate ids skipped: {}", report.duplicates_skipped);
    }
    println!("   Dimension: {}", report.dimension);
    println!("   Metric: {}", report.metric);
    println!("   Duration: {:.2?}", report.elapsed);
    println!("   Artifact: {}", report.artifact_path.display());

    Ok(())
}

/// Query the persisted index
#[inline]
pub async fn search(
    config: Config,
    query: String,
    top_k: Option<usize>,
    block: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.search.default_top_k);
    let filter = SearchFilter {
        block,
        subblock: None,
        tags,
        min_score: config.search.min_score,
    };

    let result = spawn_blocking(move || {
        let embedder = provider_from_config(&config)?;
        let engine = RetrievalEngine::open(config.engine_config(), embedder)?;
        if let Err(e) = engine.load_index() {
            if e.needs_rebuild() {
                warn!("Index unavailable: {}", e);
                eprintln!("Run 'faq-search build' to (re)build the index.");
            }
            return Err(e);
        }
        engine.search_filtered(&query, top_k, &filter)
    })
    .await
    .context("Search task failed")?
    .inspect_err(|e| println!("{}", e.user_message()))?;

    if result.is_empty() {
        println!("No matching questions found.");
        return Ok(());
    }

    for (rank, hit) in result.hits.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({} / {}, id {})",
            rank + 1,
            hit.score,
            hit.record.question,
            hit.record.block,
            hit.record.subblock,
            hit.record.id
        );
        println!("   {}", hit.record.answer);
        if !hit.record.tags.is_empty() {
            println!("   Tags: {}", hit.record.tags.iter().join(", "));
        }
        println!();
    }

    Ok(())
}

/// List blocks with their record counts, largest first
#[inline]
pub fn list_blocks(config: &Config) -> Result<()> {
    let dataset = load_dataset(config)?;
    let counts = dataset.block_counts();

    if counts.is_empty() {
        println!("The dataset has no records.");
        return Ok(());
    }

    println!("Blocks ({} total):", counts.len());
    for (block, count) in counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)))
    {
        println!("  {block} ({count})");
    }

    Ok(())
}

/// Print every question in dataset order
#[inline]
pub fn list_questions(config: &Config) -> Result<()> {
    let dataset = load_dataset(config)?;

    for record in dataset.records() {
        println!("[{}] {}", record.id, record.question);
    }

    Ok(())
}

/// Dataset report, artifact freshness and embedding backend health
#[inline]
pub async fn show_status(config: Config) -> Result<()> {
    println!("📊 FAQ Search Status Report");
    println!("{}", "=".repeat(50));
    println!();

    let status_config = config.clone();
    spawn_blocking(move || print_status(&status_config))
        .await
        .context("Status task failed")??;

    if config.embedding.provider == ProviderKind::Ollama {
        println!("🤖 Ollama Status:");
        let ollama = config.ollama.clone();
        let health = spawn_blocking(move || {
            OllamaClient::new(&ollama)?
                .with_timeout(Duration::from_secs(5))
                .with_retry_attempts(1)
                .health_check()
        })
        .await
        .context("Ollama health check task failed")?;

        match health {
            Ok(()) => {
                println!("   ✅ Ollama: Connected and model available");
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => println!("   ❌ Ollama: {}", e),
        }
    } else {
        println!("🤖 Embedding provider: {}", config.embedding.provider);
    }

    Ok(())
}

fn print_status(config: &Config) -> Result<()> {
    println!("📚 Dataset: {}", config.paths.dataset.display());
    let dataset = match Dataset::load(&config.paths.dataset) {
        Ok(dataset) => dataset,
        Err(e) => {
            println!("   ❌ {}", e);
            println!();
            return Ok(());
        }
    };

    let report = dataset.report();
    println!("   {}", report.summary());
    for (block, count) in &report.block_counts {
        println!("   • {block}: {count}");
    }
    for warning in dataset.warnings() {
        println!("   ⚠️  {warning}");
    }
    println!();

    println!("🗂️  Index: {}", config.paths.index.display());
    let embedder = provider_from_config(config)?;
    let engine = RetrievalEngine::with_dataset(config.engine_config(), dataset, embedder);
    match engine.staleness_report(&config.paths.index) {
        Ok(staleness) if staleness.is_fresh => println!("   ✅ {}", staleness.summary()),
        Ok(staleness) => println!("   ⚠️  {}", staleness.summary()),
        Err(e) => println!("   ❌ {}", e),
    }
    println!();

    Ok(())
}

fn load_dataset(config: &Config) -> Result<Dataset> {
    Dataset::load(&config.paths.dataset).with_context(|| {
        format!(
            "Failed to load dataset from {}",
            config.paths.dataset.display()
        )
    })
}
