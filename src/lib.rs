use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaqError>;

#[derive(Error, Debug)]
pub enum FaqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Index has not been built or loaded")]
    IndexNotBuilt,

    #[error("No index artifact found at {0}")]
    IndexNotFound(String),

    #[error("Stale index: {0}")]
    StaleIndex(String),

    #[error("Corrupt index: {0}")]
    IndexCorrupt(String),

    #[error("An index build is already in progress")]
    BuildInProgress,

    #[error("Embedding request timed out: {0}")]
    EmbeddingTimeout(String),

    #[error("Embedding error: {0}")]
    EmbeddingProvider(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Similarity metric mismatch: index uses {stored}, engine configured for {configured}")]
    MetricMismatch { stored: String, configured: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FaqError {
    /// Whether the same call may succeed later without fixing data or rebuilding
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BuildInProgress | Self::EmbeddingTimeout(_) | Self::EmbeddingProvider(_)
        )
    }

    /// Whether rebuilding the index from the dataset resolves this error
    #[inline]
    pub fn needs_rebuild(&self) -> bool {
        matches!(
            self,
            Self::IndexNotBuilt | Self::IndexNotFound(_) | Self::StaleIndex(_) | Self::IndexCorrupt(_)
        )
    }

    /// Generic message safe to show to end users of a conversational front end
    #[inline]
    pub fn user_message(&self) -> &'static str {
        if self.is_retryable() {
            "I can't answer right now, please try again in a moment."
        } else {
            "I can't answer right now."
        }
    }
}

pub mod builder;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod embeddings;
pub mod engine;
pub mod index;
