// Artifact freshness validation
// Compares a persisted index manifest against the loaded dataset


use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::dataset::{Dataset, RecordId};
use crate::index::ArtifactManifest;

/// Freshness check results between a dataset and a persisted index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessReport {
    /// Number of records in the dataset
    pub dataset_records: usize,
    /// Number of vectors in the index
    pub index_entries: usize,
    /// Record ids present in the dataset but not in the index
    pub missing_in_index: Vec<RecordId>,
    /// Record ids present in the index but not in the dataset
    pub orphaned_in_index: Vec<RecordId>,
    /// Whether ids, order and question texts match the build snapshot
    pub fingerprint_matches: bool,
    /// Whether the index was built with the current embedding model
    pub model_matches: bool,
    /// Overall freshness status
    pub is_fresh: bool,
}

impl StalenessReport {
    /// Compare `manifest` with `dataset` as embedded by `model_id`
    #[inline]
    pub fn compare(dataset: &Dataset, manifest: &ArtifactManifest, model_id: &str) -> Self {
        debug!(
            "Checking index artifact {} against dataset of {} records",
            manifest.build_id,
            dataset.len()
        );

        let dataset_ids = dataset.id_set();
        let index_ids: HashSet<&RecordId> = manifest.ids.iter().collect();

        let mut missing_in_index: Vec<RecordId> = dataset_ids
            .difference(&index_ids)
            .map(|&id| id.clone())
            .collect();
        missing_in_index.sort();

        let mut orphaned_in_index: Vec<RecordId> = index_ids
            .difference(&dataset_ids)
            .map(|&id| id.clone())
            .collect();
        orphaned_in_index.sort();

        let fingerprint_matches = manifest.dataset_fingerprint == dataset.fingerprint();
        let model_matches = manifest.model_id == model_id;

        let is_fresh = dataset.len() == manifest.count
            && missing_in_index.is_empty()
            && orphaned_in_index.is_empty()
            && fingerprint_matches
            && model_matches;

        let report = Self {
            dataset_records: dataset.len(),
            index_entries: manifest.count,
            missing_in_index,
            orphaned_in_index,
            fingerprint_matches,
            model_matches,
            is_fresh,
        };

        if report.is_fresh {
            info!("Index artifact {} matches the dataset", manifest.build_id);
        } else {
            warn!("Index artifact is stale: {}", report.summary());
        }

        report
    }

    /// Get the total number of issues found
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_in_index.len()
            + self.orphaned_in_index.len()
            + usize::from(!self.fingerprint_matches)
            + usize::from(!self.model_matches)
    }

    /// Get a summary string of the report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_fresh {
            return format!(
                "Index is fresh: {} records, {} vectors",
                self.dataset_records, self.index_entries
            );
        }

        let mut problems = Vec::new();
        if self.dataset_records != self.index_entries {
            problems.push(format!(
                "dataset has {} records but index has {} vectors",
                self.dataset_records, self.index_entries
            ));
        }
        if !self.missing_in_index.is_empty() {
            problems.push(format!("{} missing in index", self.missing_in_index.len()));
        }
        if !self.orphaned_in_index.is_empty() {
            problems.push(format!(
                "{} orphaned in index",
                self.orphaned_in_index.len()
            ));
        }
        if !self.fingerprint_matches {
            problems.push("dataset content changed since build".to_string());
        }
        if !self.model_matches {
            problems.push("built with a different embedding model".to_string());
        }

        format!("Index is stale ({}), rebuild required", problems.join(", "))
    }
}
