use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntityRow {
    pub id: Uuid,
    pub entity_name: String,
    pub entity_class: String,
    pub slug: String,
    pub canonical_activities: Vec<String>,
    pub canonical_roles: Vec<String>,
    pub canonical_place_types: Vec<String>,
    pub canonical_access: Vec<String>,
    pub modules_json: Value,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct UpsertEntity {
    pub entity_name: String,
    pub entity_class: String,
    pub slug: String,
    pub canonical_activities: Vec<String>,
    pub canonical_roles: Vec<String>,
    pub canonical_place_types: Vec<String>,
    pub canonical_access: Vec<String>,
    pub modules: Value,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

pub enum UpsertOutcome {
    Created(EntityRow),
    Updated(EntityRow),
}

#[derive(sqlx::FromRow)]
struct UpsertResultRow {
    #[sqlx(flatten)]
    entity: EntityRow,
    inserted: bool,
}

/// Upsert by slug. The merge step (grouping Extracted Entities by dedup key
/// and combining fields) must already have run by the time this is called;
/// two different-source extractions of the same venue racing this call
/// directly would otherwise create two slugs for one place.
pub async fn upsert_entity(pool: &PgPool, e: UpsertEntity) -> Result<UpsertOutcome> {
    let row = sqlx::query_as::<_, UpsertResultRow>(
        r#"
        INSERT INTO entity
            (entity_name, entity_class, slug, canonical_activities, canonical_roles,
             canonical_place_types, canonical_access, modules_json, lat, lng,
             address, phone, email, website, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now())
        ON CONFLICT (slug) DO UPDATE SET
            entity_name = EXCLUDED.entity_name,
            entity_class = EXCLUDED.entity_class,
            canonical_activities = EXCLUDED.canonical_activities,
            canonical_roles = EXCLUDED.canonical_roles,
            canonical_place_types = EXCLUDED.canonical_place_types,
            canonical_access = EXCLUDED.canonical_access,
            modules_json = EXCLUDED.modules_json,
            lat = COALESCE(EXCLUDED.lat, entity.lat),
            lng = COALESCE(EXCLUDED.lng, entity.lng),
            address = COALESCE(EXCLUDED.address, entity.address),
            phone = COALESCE(EXCLUDED.phone, entity.phone),
            email = COALESCE(EXCLUDED.email, entity.email),
            website = COALESCE(EXCLUDED.website, entity.website),
            updated_at = now()
        RETURNING
            id, entity_name, entity_class, slug, canonical_activities, canonical_roles,
            canonical_place_types, canonical_access, modules_json, lat, lng, address,
            phone, email, website, created_at, updated_at,
            (xmax = 0) AS inserted
        "#,
    )
    .bind(&e.entity_name)
    .bind(&e.entity_class)
    .bind(&e.slug)
    .bind(&e.canonical_activities)
    .bind(&e.canonical_roles)
    .bind(&e.canonical_place_types)
    .bind(&e.canonical_access)
    .bind(&e.modules)
    .bind(e.lat)
    .bind(e.lng)
    .bind(&e.address)
    .bind(&e.phone)
    .bind(&e.email)
    .bind(&e.website)
    .fetch_one(pool)
    .await?;

    Ok(if row.inserted {
        UpsertOutcome::Created(row.entity)
    } else {
        UpsertOutcome::Updated(row.entity)
    })
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<EntityRow>> {
    let row = sqlx::query_as::<_, EntityRow>("SELECT * FROM entity WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
