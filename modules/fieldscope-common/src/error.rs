use thiserror::Error;

/// Error taxonomy for the ingestion engine.
///
/// Only configuration/lens problems and internal invariant violations are
/// fatal to a run; everything else (fetch, mapping, persistence) is recorded
/// and the run continues. See `spec.md` §7.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("lens validation failed: {0}")]
    LensValidation(String),

    #[error("extraction boundary violation: {0}")]
    ExtractionBoundary(String),

    #[error("adapter fetch failed: {0}")]
    Fetch(String),

    #[error("adapter timed out after {0}s")]
    Timeout(u64),

    #[error("adapter rate-limited: {0}")]
    RateLimited(String),

    #[error("mapping failure: {0}")]
    Mapping(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
