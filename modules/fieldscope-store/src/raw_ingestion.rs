use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

/// A row in `raw_ingestion`. One per unique `(source, content_hash)` pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawIngestionRow {
    pub id: Uuid,
    pub source: String,
    pub content_hash: String,
    pub file_path: String,
    pub status: String,
    pub metadata_json: Value,
    pub created_at: DateTime<Utc>,
}

/// Reuses an existing row for `(source, content_hash)`, or writes the
/// payload to `<data_root>/raw/<source>/<hash>.json` and inserts a new one.
pub async fn upsert_raw_ingestion(
    pool: &PgPool,
    data_root: &str,
    source: &str,
    content_hash: &str,
    payload: &Value,
    metadata: &Value,
) -> Result<RawIngestionRow> {
    if let Some(existing) = sqlx::query_as::<_, RawIngestionRow>(
        "SELECT * FROM raw_ingestion WHERE source = $1 AND content_hash = $2",
    )
    .bind(source)
    .bind(content_hash)
    .fetch_optional(pool)
    .await?
    {
        return Ok(existing);
    }

    let file_path = write_payload_file(data_root, source, content_hash, payload)?;

    let row = sqlx::query_as::<_, RawIngestionRow>(
        r#"
        INSERT INTO raw_ingestion (source, content_hash, file_path, status, metadata_json)
        VALUES ($1, $2, $3, 'stored', $4)
        ON CONFLICT (source, content_hash) DO UPDATE SET source = EXCLUDED.source
        RETURNING *
        "#,
    )
    .bind(source)
    .bind(content_hash)
    .bind(&file_path)
    .bind(metadata)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

fn write_payload_file(
    data_root: &str,
    source: &str,
    content_hash: &str,
    payload: &Value,
) -> Result<String> {
    let dir = PathBuf::from(data_root).join("raw").join(source);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{content_hash}.json"));
    std::fs::write(&path, serde_json::to_vec_pretty(payload)?)?;
    Ok(path.to_string_lossy().to_string())
}
