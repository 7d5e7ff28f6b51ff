// Index builder
// Embeds a dataset in batches and persists the resulting index artifact


use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::dataset::Dataset;
use crate::embeddings::EmbeddingProvider;
use crate::engine::{EngineConfig, RetrievalEngine};
use crate::index::{ArtifactManifest, Metric, Provenance, VectorIndex};
use crate::{FaqError, Result};

pub const DEFAULT_BUILD_BATCH_SIZE: usize = 64;

/// Outcome of a successful index build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub build_id: Uuid,
    pub records_processed: usize,
    /// Dataset entries dropped because their id was already taken
    pub duplicates_skipped: usize,
    pub dimension: usize,
    pub metric: Metric,
    pub elapsed: Duration,
    pub artifact_path: PathBuf,
}

impl BuildReport {
    #[inline]
    pub fn summary(&self) -> String {
        format!(
            "Built index {} with {} records ({} duplicates skipped), dimension {}, metric {} in {:.2?} at {}",
            self.build_id,
            self.records_processed,
            self.duplicates_skipped,
            self.dimension,
            self.metric,
            self.elapsed,
            self.artifact_path.display()
        )
    }
}

/// Turns every record of a dataset into an index entry
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    metric: Metric,
    batch_size: usize,
}

impl IndexBuilder {
    #[inline]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, metric: Metric) -> Self {
        Self {
            embedder,
            metric,
            batch_size: DEFAULT_BUILD_BATCH_SIZE,
        }
    }

    /// Number of questions handed to the provider per call
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed every question in dataset order.
    ///
    /// Stops at the first failing batch; the returned error names how many
    /// records had been embedded before it.
    #[inline]
    pub fn embed_dataset(&self, dataset: &Dataset) -> Result<Vec<Vec<f32>>> {
        let total = dataset.len();
        let expected = self.embedder.dimension();
        let mut vectors = Vec::with_capacity(total);

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(total as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        for batch in dataset.records().chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|r| r.question.clone()).collect();
            if let Some(first) = batch.first() {
                bar.set_message(format!("record {}", first.id));
            }

            let embedded = match self.embedder.embed_batch(&texts) {
                Ok(embedded) => embedded,
                Err(e) => {
                    error!(
                        "Embedding failed after {} of {} records: {}",
                        vectors.len(),
                        total,
                        e
                    );
                    bar.abandon();
                    return Err(with_progress(e, vectors.len(), total));
                }
            };

            if embedded.len() != texts.len() {
                bar.abandon();
                return Err(with_progress(
                    FaqError::EmbeddingProvider(format!(
                        "provider returned {} vectors for {} texts",
                        embedded.len(),
                        texts.len()
                    )),
                    vectors.len(),
                    total,
                ));
            }

            if let Some(bad) = embedded.iter().find(|v| v.len() != expected) {
                bar.abandon();
                return Err(FaqError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }

            vectors.extend(embedded);
            bar.set_position(vectors.len() as u64);
            debug!("Embedded {}/{} records", vectors.len(), total);
        }

        bar.finish_and_clear();
        Ok(vectors)
    }

    /// Embed, index and persist `dataset` at `artifact_path`, replacing any
    /// previous artifact. Nothing is written when embedding fails.
    #[inline]
    pub fn build_and_save(
        &self,
        dataset: &Dataset,
        artifact_path: &Path,
    ) -> Result<(VectorIndex, ArtifactManifest, BuildReport)> {
        let started = Instant::now();

        let vectors = self.embed_dataset(dataset)?;
        let index = VectorIndex::build(vectors, dataset.ids(), self.metric)?;

        let provenance = Provenance {
            model_id: self.embedder.model_id(),
            dataset_fingerprint: dataset.fingerprint(),
        };
        let manifest = index.save(artifact_path, &provenance)?;

        let report = BuildReport {
            build_id: manifest.build_id,
            records_processed: index.len(),
            duplicates_skipped: dataset.warnings().len(),
            dimension: index.dimension(),
            metric: self.metric,
            elapsed: started.elapsed(),
            artifact_path: artifact_path.to_path_buf(),
        };
        info!("{}", report.summary());

        Ok((index, manifest, report))
    }
}

/// Offline build: load the dataset, build and persist its index
#[inline]
pub fn run(config: EngineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<BuildReport> {
    let engine = RetrievalEngine::open(config, embedder)?;
    engine.build_index()
}

fn with_progress(e: FaqError, processed: usize, total: usize) -> FaqError {
    let progress = format!("after {processed} of {total} records");
    match e {
        FaqError::EmbeddingTimeout(msg) => FaqError::EmbeddingTimeout(format!("{msg} ({progress})")),
        FaqError::EmbeddingProvider(msg) => {
            FaqError::EmbeddingProvider(format!("{msg} ({progress})"))
        }
        other => other,
    }
}
