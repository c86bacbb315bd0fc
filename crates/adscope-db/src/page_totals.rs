//! Database operations for `ad_library_page_totals`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of a provider-reported aggregate count (e.g.
/// total ads for a page + filter combination).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdLibraryPageTotalRow {
    pub id: i64,
    pub research_run_id: i64,
    pub brand_channel_identity_id: i64,
    pub query_key: String,
    pub total_count: i32,
    pub raw_payload: serde_json::Value,
    pub captured_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Record a provider-reported page total, keyed by
/// `(research_run_id, brand_channel_identity_id, query_key)`.
///
/// Re-snapshotting the same key overwrites every mutable column and bumps
/// the timestamps — exactly one row per key, no history. Callers must not
/// assume earlier snapshots are retained.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad_library_page_total(
    pool: &PgPool,
    research_run_id: i64,
    brand_channel_identity_id: i64,
    query_key: &str,
    total_count: i32,
    raw_payload: &serde_json::Value,
) -> Result<AdLibraryPageTotalRow, DbError> {
    let row = sqlx::query_as::<_, AdLibraryPageTotalRow>(
        "INSERT INTO ad_library_page_totals \
             (research_run_id, brand_channel_identity_id, query_key, total_count, raw_payload) \
         VALUES ($1, $2, $3, $4, $5::jsonb) \
         ON CONFLICT (research_run_id, brand_channel_identity_id, query_key) DO UPDATE SET \
             total_count = EXCLUDED.total_count, \
             raw_payload = EXCLUDED.raw_payload, \
             captured_at = NOW(), \
             updated_at  = NOW() \
         RETURNING id, research_run_id, brand_channel_identity_id, query_key, \
                   total_count, raw_payload, captured_at, updated_at",
    )
    .bind(research_run_id)
    .bind(brand_channel_identity_id)
    .bind(query_key)
    .bind(total_count)
    .bind(raw_payload)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
