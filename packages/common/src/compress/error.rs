use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressError {
    /// No strategy handles this content type.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// The strategy ran and failed. `detail` carries the underlying diagnostic
    /// (process stderr, decoder message).
    #[error("{strategy} compression failed: {detail}")]
    Failed {
        strategy: &'static str,
        detail: String,
    },
}

impl CompressError {
    pub fn failed(strategy: &'static str, detail: impl Into<String>) -> Self {
        Self::Failed {
            strategy,
            detail: detail.into(),
        }
    }
}
