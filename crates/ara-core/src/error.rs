use thiserror::Error;

#[derive(Error, Debug)]
pub enum AraError {
    #[error("missing required columns: {0:?}")]
    InputSchema(Vec<String>),

    #[error("missing features: {shown:?} (total {total})")]
    FeatureMismatch { shown: Vec<String>, total: usize },

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("unsupported ingestion source: {0}")]
    UnsupportedSource(String),

    #[error("bundle load failed: {0}")]
    BundleLoad(String),

    #[error("scoring error: {0}")]
    Scoring(String),

    #[error("store error: {0}")]
    Store(String),
}

impl AraError {
    /// Build a feature-mismatch error, truncating the reported list to 10 names.
    pub fn feature_mismatch(missing: Vec<String>) -> Self {
        let total = missing.len();
        let shown = missing.into_iter().take(10).collect();
        AraError::FeatureMismatch { shown, total }
    }
}
