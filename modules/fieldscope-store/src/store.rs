use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::connector_usage;
use crate::entity::{self, EntityRow, UpsertEntity, UpsertOutcome};
use crate::error::{Result, StoreError};
use crate::extracted_entity::{self, ExtractedEntityRow, InsertExtractedEntity};
use crate::orchestration_run;
use crate::raw_ingestion::{self, RawIngestionRow};

/// The relational store backing persistence and finalization. One pool,
/// shared across the lifetime of the process.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    data_root: String,
}

impl Store {
    /// Connect to `database_url`. Rejects non-Postgres URLs: finalization
    /// requires a production-grade RDBMS, not a sqlite-style file URL.
    pub async fn connect(database_url: &str, data_root: impl Into<String>) -> Result<Self> {
        if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
            return Err(StoreError::UnsupportedDatabase(database_url.to_string()));
        }
        let pool = PgPool::connect(database_url)
            .await
            .map_err(StoreError::Database)?;
        Ok(Self {
            pool,
            data_root: data_root.into(),
        })
    }

    pub fn from_pool(pool: PgPool, data_root: impl Into<String>) -> Self {
        Self {
            pool,
            data_root: data_root.into(),
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }

    pub async fn upsert_raw_ingestion(
        &self,
        source: &str,
        content_hash: &str,
        payload: &Value,
        metadata: &Value,
    ) -> Result<RawIngestionRow> {
        raw_ingestion::upsert_raw_ingestion(
            &self.pool,
            &self.data_root,
            source,
            content_hash,
            payload,
            metadata,
        )
        .await
    }

    pub async fn insert_extracted_entity(
        &self,
        e: InsertExtractedEntity,
    ) -> Result<ExtractedEntityRow> {
        extracted_entity::insert_extracted_entity(&self.pool, e).await
    }

    pub async fn extracted_entities_for_raw_ingestion(
        &self,
        raw_ingestion_id: Uuid,
    ) -> Result<Vec<ExtractedEntityRow>> {
        extracted_entity::by_raw_ingestion(&self.pool, raw_ingestion_id).await
    }

    pub async fn upsert_entity(&self, e: UpsertEntity) -> Result<UpsertOutcome> {
        entity::upsert_entity(&self.pool, e).await
    }

    pub async fn find_entity_by_slug(&self, slug: &str) -> Result<Option<EntityRow>> {
        entity::find_by_slug(&self.pool, slug).await
    }

    pub async fn check_and_increment_usage(
        &self,
        connector_name: &str,
        rate_limit_per_day: i32,
    ) -> Result<Option<i32>> {
        connector_usage::check_and_increment(&self.pool, connector_name, rate_limit_per_day).await
    }

    pub async fn start_run(&self, query: &str, lens_id: &str, mode: &str) -> Result<Uuid> {
        orchestration_run::start_run(&self.pool, query, lens_id, mode).await
    }

    pub async fn finish_run(&self, run_id: Uuid, report: &Value) -> Result<()> {
        orchestration_run::finish_run(&self.pool, run_id, report).await
    }
}
