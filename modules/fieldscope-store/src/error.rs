use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error writing raw payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize raw payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("non-production database url rejected: {0}")]
    UnsupportedDatabase(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
