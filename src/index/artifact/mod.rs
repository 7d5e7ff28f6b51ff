// Index artifact persistence
// `manifest.json` + `vectors.bin`, swapped into place as a unit

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Metric, VectorIndex};
use crate::dataset::RecordId;
use crate::{FaqError, Result};

/// Artifact layout version written by this crate
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const VECTORS_FILE: &str = "vectors.bin";

const F32_BYTES: usize = 4;

/// Where the vectors in an artifact came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Embedding model that produced the vectors
    pub model_id: String,
    /// Fingerprint of the dataset snapshot the index was built from
    pub dataset_fingerprint: String,
}

/// Metadata written next to the vector data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub metric: Metric,
    pub dimension: usize,
    pub count: usize,
    pub model_id: String,
    pub dataset_fingerprint: String,
    pub vectors_sha256: String,
    /// Record id for each index position
    pub ids: Vec<RecordId>,
}

/// An index restored from disk together with its manifest
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub index: VectorIndex,
    pub manifest: ArtifactManifest,
}

pub(super) fn save(
    index: &VectorIndex,
    dir: &Path,
    provenance: &Provenance,
) -> Result<ArtifactManifest> {
    let bytes = encode_vectors(index.raw_vectors());
    let manifest = ArtifactManifest {
        format_version: FORMAT_VERSION,
        build_id: Uuid::new_v4(),
        created_at: Utc::now(),
        metric: index.metric(),
        dimension: index.dimension(),
        count: index.len(),
        model_id: provenance.model_id.clone(),
        dataset_fingerprint: provenance.dataset_fingerprint.clone(),
        vectors_sha256: sha256_hex(&bytes),
        ids: index.ids().to_vec(),
    };

    let (parent, name) = split_dir(dir)?;
    fs::create_dir_all(&parent)?;

    let staging = parent.join(format!(".{name}.tmp-{}", manifest.build_id));
    if let Err(e) = write_staging(&staging, &bytes, &manifest) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if let Err(e) = swap_into_place(&staging, dir, &parent, &name, manifest.build_id) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    info!(
        "Saved index artifact {} ({} vectors, dimension {}) to {}",
        manifest.build_id,
        manifest.count,
        manifest.dimension,
        dir.display()
    );
    Ok(manifest)
}

/// Read and check only the manifest
#[inline]
pub fn read_manifest(dir: &Path) -> Result<ArtifactManifest> {
    if !dir.exists() {
        return Err(FaqError::IndexNotFound(dir.display().to_string()));
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        FaqError::IndexCorrupt(format!(
            "cannot read {}: {}",
            manifest_path.display(),
            e
        ))
    })?;

    let manifest: ArtifactManifest = serde_json::from_str(&content)
        .map_err(|e| FaqError::IndexCorrupt(format!("unreadable manifest: {e}")))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(FaqError::IndexCorrupt(format!(
            "unsupported artifact format version {} (expected {})",
            manifest.format_version, FORMAT_VERSION
        )));
    }

    if manifest.ids.len() != manifest.count {
        return Err(FaqError::IndexCorrupt(format!(
            "id mapping has {} entries but the manifest records {} vectors",
            manifest.ids.len(),
            manifest.count
        )));
    }

    if manifest.count > 0 && manifest.dimension == 0 {
        return Err(FaqError::IndexCorrupt(
            "non-empty index with zero dimension".to_string(),
        ));
    }

    Ok(manifest)
}

pub(super) fn load(dir: &Path) -> Result<LoadedIndex> {
    debug!("Loading index artifact from {}", dir.display());
    let manifest = read_manifest(dir)?;

    let vectors_path = dir.join(VECTORS_FILE);
    let bytes = fs::read(&vectors_path).map_err(|e| {
        FaqError::IndexCorrupt(format!("cannot read {}: {}", vectors_path.display(), e))
    })?;

    let expected_len = manifest
        .count
        .checked_mul(manifest.dimension)
        .and_then(|n| n.checked_mul(F32_BYTES))
        .ok_or_else(|| {
            FaqError::IndexCorrupt(format!(
                "{} vectors of dimension {} overflow the addressable size",
                manifest.count, manifest.dimension
            ))
        })?;
    if bytes.len() != expected_len {
        return Err(FaqError::IndexCorrupt(format!(
            "vector data is {} bytes, expected {} for {} vectors of dimension {}",
            bytes.len(),
            expected_len,
            manifest.count,
            manifest.dimension
        )));
    }

    if sha256_hex(&bytes) != manifest.vectors_sha256 {
        return Err(FaqError::IndexCorrupt(
            "vector data checksum does not match the manifest".to_string(),
        ));
    }

    let index = VectorIndex::from_parts(
        manifest.metric,
        manifest.dimension,
        manifest.ids.clone(),
        decode_vectors(&bytes),
    );

    info!(
        "Loaded index artifact {} ({} vectors) from {}",
        manifest.build_id,
        manifest.count,
        dir.display()
    );
    Ok(LoadedIndex { index, manifest })
}

fn write_staging(staging: &Path, bytes: &[u8], manifest: &ArtifactManifest) -> Result<()> {
    fs::create_dir_all(staging)?;

    let mut vectors = fs::File::create(staging.join(VECTORS_FILE))?;
    vectors.write_all(bytes)?;
    vectors.sync_all()?;

    // Manifest last: a directory without one is never mistaken for a complete artifact
    let manifest_json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| FaqError::Other(anyhow::anyhow!("failed to serialize manifest: {e}")))?;
    let mut manifest_file = fs::File::create(staging.join(MANIFEST_FILE))?;
    manifest_file.write_all(&manifest_json)?;
    manifest_file.sync_all()?;

    Ok(())
}

fn swap_into_place(
    staging: &Path,
    dir: &Path,
    parent: &Path,
    name: &str,
    build_id: Uuid,
) -> Result<()> {
    if !dir.exists() {
        fs::rename(staging, dir)?;
        return Ok(());
    }

    let retired = parent.join(format!(".{name}.old-{build_id}"));
    fs::rename(dir, &retired)?;

    if let Err(e) = fs::rename(staging, dir) {
        warn!("Failed to move new artifact into place, restoring previous one");
        let _ = fs::rename(&retired, dir);
        return Err(e.into());
    }

    if let Err(e) = fs::remove_dir_all(&retired) {
        warn!(
            "Failed to remove previous artifact at {}: {}",
            retired.display(),
            e
        );
    }
    Ok(())
}

fn split_dir(dir: &Path) -> Result<(PathBuf, String)> {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            FaqError::Config(format!("invalid index location: {}", dir.display()))
        })?;
    let parent = dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((parent, name))
}

fn encode_vectors(vectors: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vectors.len() * F32_BYTES);
    for value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vectors(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
