#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::EmbeddingProvider;
use crate::Result;
use crate::index::normalize;

static WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word regex is valid"));

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic local embedder using signed feature hashing.
///
/// Each lowercase word and each character trigram of the padded word is
/// hashed into one of `dimension` buckets. The result is L2-normalized, so
/// texts sharing vocabulary score high under cosine similarity. No model
/// download and no network, which makes it the backend for tests and for
/// offline builds.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in WORD_REGEX.find_iter(&lowered).flatten() {
            let word = word.as_str();
            self.add_feature(&mut vector, word, WORD_WEIGHT);

            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for trigram in padded.windows(3) {
                let trigram: String = trigram.iter().collect();
                self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        normalize(&mut vector);
        debug!(
            "Hashed text (length: {}) into {} dimensions",
            text.len(),
            self.dimension
        );
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> String {
        format!("hashing-v1-{}", self.dimension)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
