use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrchestrationRunRow {
    pub id: Uuid,
    pub query: String,
    pub lens_id: String,
    pub mode: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report_json: Option<Value>,
}

pub async fn start_run(pool: &PgPool, query: &str, lens_id: &str, mode: &str) -> Result<Uuid> {
    let id: (Uuid,) = sqlx::query_as(
        "INSERT INTO orchestration_run (query, lens_id, mode) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(query)
    .bind(lens_id)
    .bind(mode)
    .fetch_one(pool)
    .await?;

    Ok(id.0)
}

pub async fn finish_run(pool: &PgPool, run_id: Uuid, report: &Value) -> Result<()> {
    sqlx::query(
        "UPDATE orchestration_run SET finished_at = now(), report_json = $2 WHERE id = $1",
    )
    .bind(run_id)
    .bind(report)
    .execute(pool)
    .await?;

    Ok(())
}
