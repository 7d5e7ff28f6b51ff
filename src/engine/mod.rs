// Retrieval engine
// Owns the dataset and index lifecycle and serves similarity queries

pub mod staleness;


use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::builder::{BuildReport, IndexBuilder};
use crate::dataset::{Dataset, FaqRecord};
use crate::embeddings::EmbeddingProvider;
use crate::index::{ArtifactManifest, Metric, VectorIndex, artifact};
use crate::{FaqError, Result};

pub use staleness::StalenessReport;

/// Locations and metric for one engine instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub dataset_path: PathBuf,
    pub index_path: PathBuf,
    pub metric: Metric,
}

/// Lifecycle of an engine; construction already loads the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    DatasetLoaded,
    IndexReady,
}

/// A matched record and its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: FaqRecord,
    pub score: f32,
}

/// Ranked matches, best first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub hits: Vec<SearchHit>,
}

impl QueryResult {
    /// `(question, answer, score)` tuples for a conversational front end
    #[inline]
    pub fn answers(&self) -> Vec<(&str, &str, f32)> {
        self.hits
            .iter()
            .map(|hit| {
                (
                    hit.record.question.as_str(),
                    hit.record.answer.as_str(),
                    hit.score,
                )
            })
            .collect()
    }

    #[inline]
    pub fn best(&self) -> Option<&SearchHit> {
        self.hits.first()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Optional restrictions applied on top of similarity ranking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub block: Option<String>,
    pub subblock: Option<String>,
    /// Every listed tag must be present on the record
    pub tags: Vec<String>,
    pub min_score: Option<f32>,
}

impl SearchFilter {
    fn accepts(&self, record: &FaqRecord, score: f32) -> bool {
        self.block.as_ref().is_none_or(|block| &record.block == block)
            && self
                .subblock
                .as_ref()
                .is_none_or(|subblock| &record.subblock == subblock)
            && self.tags.iter().all(|tag| record.has_tag(tag))
            && self.min_score.is_none_or(|min| score >= min)
    }
}

// Immutable once installed; readers clone the Arc and never block a build
#[derive(Debug)]
struct ReadyIndex {
    index: VectorIndex,
    manifest: ArtifactManifest,
}

/// Semantic retrieval over one FAQ dataset.
///
/// `search` requires an index, either built with [`RetrievalEngine::build_index`]
/// or restored with [`RetrievalEngine::load_index`]; every other operation
/// only needs the dataset. The engine is `Send + Sync` and queries may run
/// from many threads while at most one build runs at a time.
pub struct RetrievalEngine {
    config: EngineConfig,
    dataset: Arc<Dataset>,
    embedder: Arc<dyn EmbeddingProvider>,
    ready: RwLock<Option<Arc<ReadyIndex>>>,
    building: AtomicBool,
}

struct BuildGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BuildGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { flag })
            .map_err(|_| FaqError::BuildInProgress)
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl RetrievalEngine {
    /// Load the dataset named in `config`
    #[inline]
    pub fn open(config: EngineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let dataset = Dataset::load(&config.dataset_path)?;
        Ok(Self::with_dataset(config, dataset, embedder))
    }

    /// Use an already loaded dataset
    #[inline]
    pub fn with_dataset(
        config: EngineConfig,
        dataset: Dataset,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        debug!(
            "Retrieval engine ready with {} records, index location {}",
            dataset.len(),
            config.index_path.display()
        );
        Self {
            config,
            dataset: Arc::new(dataset),
            embedder,
            ready: RwLock::new(None),
            building: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn state(&self) -> EngineState {
        if self.snapshot().is_some() {
            EngineState::IndexReady
        } else {
            EngineState::DatasetLoaded
        }
    }

    /// Whether a build is currently running on this instance
    #[inline]
    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    /// Distinct block names
    #[inline]
    pub fn blocks(&self) -> BTreeSet<String> {
        self.dataset.blocks()
    }

    /// All question texts in dataset order
    #[inline]
    pub fn questions(&self) -> Vec<String> {
        self.dataset.questions()
    }

    /// Manifest of the index currently served, if any
    #[inline]
    pub fn index_manifest(&self) -> Option<ArtifactManifest> {
        self.snapshot().map(|ready| ready.manifest.clone())
    }

    /// Embed every record, rebuild the index from scratch, persist it and
    /// start serving it. Fails with [`FaqError::BuildInProgress`] while
    /// another build runs on this instance.
    #[inline]
    pub fn build_index(&self) -> Result<BuildReport> {
        let _guard = BuildGuard::acquire(&self.building)?;
        info!(
            "Building index for {} records at {}",
            self.dataset.len(),
            self.config.index_path.display()
        );

        let builder = IndexBuilder::new(Arc::clone(&self.embedder), self.config.metric);
        let (index, manifest, report) =
            builder.build_and_save(&self.dataset, &self.config.index_path)?;

        self.install(ReadyIndex { index, manifest });
        Ok(report)
    }

    /// Restore the index from the configured location
    #[inline]
    pub fn load_index(&self) -> Result<()> {
        let path = self.config.index_path.clone();
        self.load_index_from(&path)
    }

    /// Restore a persisted index without recomputing embeddings. Shares the
    /// single-writer slot with [`RetrievalEngine::build_index`], so it fails
    /// with [`FaqError::BuildInProgress`] while a build runs.
    #[inline]
    pub fn load_index_from(&self, path: &Path) -> Result<()> {
        let _guard = BuildGuard::acquire(&self.building)?;
        let loaded = VectorIndex::load(path)?;
        let manifest = loaded.manifest;

        if manifest.metric != self.config.metric {
            return Err(FaqError::MetricMismatch {
                stored: manifest.metric.to_string(),
                configured: self.config.metric.to_string(),
            });
        }

        if manifest.count > 0 && manifest.dimension != self.embedder.dimension() {
            return Err(FaqError::IndexCorrupt(format!(
                "stored dimension {} does not match embedding dimension {}",
                manifest.dimension,
                self.embedder.dimension()
            )));
        }

        let report = StalenessReport::compare(&self.dataset, &manifest, &self.embedder.model_id());
        if !report.is_fresh {
            return Err(FaqError::StaleIndex(report.summary()));
        }

        self.install(ReadyIndex {
            index: loaded.index,
            manifest,
        });
        Ok(())
    }

    /// Compare the artifact at `path` with the dataset without loading vectors
    #[inline]
    pub fn staleness_report(&self, path: &Path) -> Result<StalenessReport> {
        let manifest = artifact::read_manifest(path)?;
        Ok(StalenessReport::compare(
            &self.dataset,
            &manifest,
            &self.embedder.model_id(),
        ))
    }

    /// The `top_k` records most similar to `query`, best first
    #[inline]
    pub fn search(&self, query: &str, top_k: usize) -> Result<QueryResult> {
        self.search_filtered(query, top_k, &SearchFilter::default())
    }

    /// Like [`RetrievalEngine::search`], keeping only records `filter` accepts
    #[inline]
    pub fn search_filtered(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<QueryResult> {
        let ready = self.snapshot().ok_or(FaqError::IndexNotBuilt)?;

        let vector = self.embedder.embed(query)?;
        // Filtering needs the full ranking so that `top_k` matches survive it
        let depth = if *filter == SearchFilter::default() {
            top_k
        } else {
            ready.index.len()
        };
        let neighbors = ready.index.search(&vector, depth)?;

        let mut hits = Vec::with_capacity(top_k.min(neighbors.len()));
        for neighbor in neighbors {
            if hits.len() == top_k {
                break;
            }
            let record = self.dataset.get(&neighbor.id).ok_or_else(|| {
                FaqError::StaleIndex(format!("index refers to unknown record {}", neighbor.id))
            })?;
            if filter.accepts(record, neighbor.score) {
                hits.push(SearchHit {
                    record: record.clone(),
                    score: neighbor.score,
                });
            }
        }

        debug!(
            "Query (length: {}) returned {} hits",
            query.len(),
            hits.len()
        );
        Ok(QueryResult { hits })
    }

    fn snapshot(&self) -> Option<Arc<ReadyIndex>> {
        self.ready
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(&self, ready: ReadyIndex) {
        info!(
            "Serving index {} ({} vectors)",
            ready.manifest.build_id,
            ready.index.len()
        );
        *self.ready.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(ready));
    }
}
