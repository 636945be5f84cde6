use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExtractedEntityRow {
    pub id: Uuid,
    pub source: String,
    pub entity_class: String,
    pub attributes_json: Value,
    pub discovered_attributes_json: Value,
    pub external_ids_json: Value,
    pub raw_ingestion_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub struct InsertExtractedEntity {
    pub source: String,
    pub entity_class: String,
    pub attributes: Value,
    pub discovered_attributes: Value,
    pub external_ids: Value,
    pub raw_ingestion_id: Uuid,
}

pub async fn insert_extracted_entity(
    pool: &PgPool,
    e: InsertExtractedEntity,
) -> Result<ExtractedEntityRow> {
    let row = sqlx::query_as::<_, ExtractedEntityRow>(
        r#"
        INSERT INTO extracted_entity
            (source, entity_class, attributes_json, discovered_attributes_json,
             external_ids_json, raw_ingestion_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&e.source)
    .bind(&e.entity_class)
    .bind(&e.attributes)
    .bind(&e.discovered_attributes)
    .bind(&e.external_ids)
    .bind(e.raw_ingestion_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn by_raw_ingestion(
    pool: &PgPool,
    raw_ingestion_id: Uuid,
) -> Result<Vec<ExtractedEntityRow>> {
    let rows = sqlx::query_as::<_, ExtractedEntityRow>(
        "SELECT * FROM extracted_entity WHERE raw_ingestion_id = $1 ORDER BY created_at ASC",
    )
    .bind(raw_ingestion_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
