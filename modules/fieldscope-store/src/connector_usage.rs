use sqlx::PgPool;

use crate::error::Result;

/// Atomically checks and increments today's request count for `connector_name`.
/// Returns the new count if the adapter is still under `rate_limit_per_day`,
/// or `None` if the limit is already reached — a single upsert-with-
/// conditional-increment round trip, no separate read-then-write.
pub async fn check_and_increment(
    pool: &PgPool,
    connector_name: &str,
    rate_limit_per_day: i32,
) -> Result<Option<i32>> {
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        INSERT INTO connector_usage (connector_name, usage_date, request_count)
        VALUES ($1, (now() AT TIME ZONE 'utc')::date, 1)
        ON CONFLICT (connector_name, usage_date) DO UPDATE
            SET request_count = connector_usage.request_count + 1
            WHERE connector_usage.request_count < $2
        RETURNING request_count
        "#,
    )
    .bind(connector_name)
    .bind(rate_limit_per_day)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(count,)| count))
}
