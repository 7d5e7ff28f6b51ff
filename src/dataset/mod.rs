// FAQ dataset loading
// Parses the `{"dataset": [...]}` source into typed records

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{FaqError, Result};

/// Name of the top-level key holding the record list
pub const DATASET_KEY: &str = "dataset";

/// Identifier of a FAQ record; datasets use either integers or strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RecordId {
    #[inline]
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// One knowledge-base entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqRecord {
    pub id: RecordId,
    pub block: String,
    pub subblock: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FaqRecord {
    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Non-fatal anomaly found while loading; logged, never returned as an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    DuplicateId {
        id: RecordId,
        /// Position of the kept record in the source list
        first_position: usize,
        /// Position of the skipped record in the source list
        duplicate_position: usize,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId {
                id,
                first_position,
                duplicate_position,
            } => write!(
                f,
                "duplicate id {id} at record #{duplicate_position} (first seen at #{first_position}), skipped"
            ),
        }
    }
}

// Every field optional so a missing one can be reported with its record position
#[derive(Debug, Deserialize)]
struct RawRecord {
    id: Option<RecordId>,
    block: Option<String>,
    subblock: Option<String>,
    question: Option<String>,
    answer: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    dataset: Option<Vec<RawRecord>>,
}

impl RawRecord {
    fn into_record(self, position: usize) -> Result<FaqRecord> {
        fn required<T>(value: Option<T>, field: &str, position: usize) -> Result<T> {
            value.ok_or_else(|| {
                FaqError::DataFormat(format!(
                    "record #{position} is missing required field `{field}`"
                ))
            })
        }

        Ok(FaqRecord {
            id: required(self.id, "id", position)?,
            block: required(self.block, "block", position)?,
            subblock: required(self.subblock, "subblock", position)?,
            question: required(self.question, "question", position)?,
            answer: required(self.answer, "answer", position)?,
            tags: self.tags,
        })
    }
}

/// A loaded FAQ dataset, ordered as in the source with duplicate ids removed
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<FaqRecord>,
    positions: HashMap<RecordId, usize>,
    warnings: Vec<DataQualityWarning>,
}

impl Dataset {
    /// Load and parse a dataset file
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading FAQ dataset from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            FaqError::DataFormat(format!("failed to read dataset {}: {}", path.display(), e))
        })?;

        let dataset = Self::from_json_str(&content)?;
        info!(
            "Loaded {} FAQ records from {} ({} warnings)",
            dataset.len(),
            path.display(),
            dataset.warnings.len()
        );
        Ok(dataset)
    }

    /// Parse a dataset from its JSON text
    #[inline]
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDataset = serde_json::from_str(content)
            .map_err(|e| FaqError::DataFormat(format!("invalid dataset JSON: {e}")))?;

        let raw_records = raw.dataset.ok_or_else(|| {
            FaqError::DataFormat(format!("missing top-level `{DATASET_KEY}` key"))
        })?;

        let records = raw_records
            .into_iter()
            .enumerate()
            .map(|(position, raw)| raw.into_record(position))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_records(records))
    }

    /// Build a dataset from records, keeping the first occurrence of each id
    #[inline]
    pub fn from_records(records: Vec<FaqRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());
        let mut source_positions: HashMap<RecordId, usize> = HashMap::new();
        let mut warnings = Vec::new();

        for (source_position, record) in records.into_iter().enumerate() {
            if let Some(&first_position) = source_positions.get(&record.id) {
                let warning = DataQualityWarning::DuplicateId {
                    id: record.id,
                    first_position,
                    duplicate_position: source_position,
                };
                warn!("Data quality warning: {}", warning);
                warnings.push(warning);
                continue;
            }

            source_positions.insert(record.id.clone(), source_position);
            positions.insert(record.id.clone(), kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            positions,
            warnings,
        }
    }

    #[inline]
    pub fn records(&self) -> &[FaqRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, id: &RecordId) -> Option<&FaqRecord> {
        self.positions.get(id).map(|&position| &self.records[position])
    }

    #[inline]
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    /// Record ids in dataset order
    #[inline]
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    #[inline]
    pub fn id_set(&self) -> HashSet<&RecordId> {
        self.records.iter().map(|r| &r.id).collect()
    }

    /// Distinct block names
    #[inline]
    pub fn blocks(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.block.clone()).collect()
    }

    /// Question texts in dataset order
    #[inline]
    pub fn questions(&self) -> Vec<String> {
        self.records.iter().map(|r| r.question.clone()).collect()
    }

    /// Number of records in each block
    #[inline]
    pub fn block_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.block.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// SHA-256 over ids and question texts in order; changes whenever the
    /// dataset changes in a way that invalidates a built index
    #[inline]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for record in &self.records {
            hasher.update(record.id.to_string().as_bytes());
            hasher.update([0x1f]);
            hasher.update(record.question.as_bytes());
            hasher.update([0x1e]);
        }
        format!("{:x}", hasher.finalize())
    }

    #[inline]
    pub fn report(&self) -> DatasetReport {
        DatasetReport {
            total_records: self.len(),
            duplicate_ids: self
                .warnings
                .iter()
                .map(|w| match w {
                    DataQualityWarning::DuplicateId { id, .. } => id.clone(),
                })
                .collect(),
            block_counts: self.block_counts(),
        }
    }
}

/// Summary of a loaded dataset for operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    pub total_records: usize,
    pub duplicate_ids: Vec<RecordId>,
    pub block_counts: BTreeMap<String, usize>,
}

impl DatasetReport {
    #[inline]
    pub fn summary(&self) -> String {
        let duplicates = if self.duplicate_ids.is_empty() {
            "all ids unique".to_string()
        } else {
            format!("{} duplicate ids skipped", self.duplicate_ids.len())
        };
        format!(
            "{} records in {} blocks, {}",
            self.total_records,
            self.block_counts.len(),
            duplicates
        )
    }
}
