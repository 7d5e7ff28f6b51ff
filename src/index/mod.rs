// Vector index module
// Exact nearest-neighbor search over record embeddings

pub mod artifact;


use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::dataset::RecordId;
use crate::{FaqError, Result};

pub use artifact::{ArtifactManifest, FORMAT_VERSION, LoadedIndex, Provenance};

/// Similarity used for both build and query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Dot product of L2-normalized vectors, in [-1, 1]
    #[default]
    Cosine,
    /// Raw dot product
    InnerProduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::InnerProduct => write!(f, "inner_product"),
        }
    }
}

/// One search hit: the record id and its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: RecordId,
    pub position: usize,
    pub score: f32,
}

/// Flat vector index. Vectors are stored row-major in insertion order and
/// never mutated after `build`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metric: Metric,
    dimension: usize,
    ids: Vec<RecordId>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from one vector per id, in the same order
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>, ids: Vec<RecordId>, metric: Metric) -> Result<Self> {
        if vectors.len() != ids.len() {
            return Err(FaqError::Config(format!(
                "cannot build index from {} vectors and {} ids",
                vectors.len(),
                ids.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 && !vectors.is_empty() {
            return Err(FaqError::Config(
                "cannot build index from zero-length vectors".to_string(),
            ));
        }
        let mut flat = Vec::with_capacity(vectors.len() * dimension);

        for mut vector in vectors {
            if vector.len() != dimension {
                return Err(FaqError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if metric == Metric::Cosine {
                normalize(&mut vector);
            }
            flat.extend_from_slice(&vector);
        }

        debug!(
            "Built {} index with {} vectors of dimension {}",
            metric,
            ids.len(),
            dimension
        );

        Ok(Self {
            metric,
            dimension,
            ids,
            vectors: flat,
        })
    }

    pub(crate) fn from_parts(
        metric: Metric,
        dimension: usize,
        ids: Vec<RecordId>,
        vectors: Vec<f32>,
    ) -> Self {
        Self {
            metric,
            dimension,
            ids,
            vectors,
        }
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record ids by index position
    #[inline]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub(crate) fn raw_vectors(&self) -> &[f32] {
        &self.vectors
    }

    /// The `top_k` most similar vectors, best first. Equal scores keep
    /// insertion order; `top_k` beyond the index size is clamped.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(FaqError::IndexCorrupt(format!(
                "query vector has dimension {} but the index stores dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut query = query.to_vec();
        if self.metric == Metric::Cosine {
            normalize(&mut query);
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| dot(row, &query))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| compare_scores(a.1, b.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k.min(self.len()));

        Ok(scored
            .into_iter()
            .map(|(position, score)| Neighbor {
                id: self.ids[position].clone(),
                position,
                score,
            })
            .collect())
    }

    /// Persist as an artifact directory, replacing any previous one
    #[inline]
    pub fn save(&self, dir: &Path, provenance: &Provenance) -> Result<ArtifactManifest> {
        artifact::save(self, dir, provenance)
    }

    /// Restore an index persisted with [`VectorIndex::save`]
    #[inline]
    pub fn load(dir: &Path) -> Result<LoadedIndex> {
        artifact::load(dir)
    }
}

// Descending by score; NaN sorts last
fn compare_scores(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale to unit L2 length; the zero vector stays zero
pub(crate) fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
