//! Batched scans for ads whose derived rows are missing.
//!
//! Each scan is a left-join-is-null query with a bound, ordered by ad id.
//! "Missing" is recomputed from current state on every call, so a crashed
//! backfill resumes correctly with no checkpoint.

use sqlx::PgPool;

use crate::ads::AdRow;
use crate::DbError;

const AD_COLUMNS_QUALIFIED: &str = "a.id, a.brand_id, a.brand_channel_identity_id, a.channel, \
     a.external_ad_id, a.ad_status, a.started_running_at, a.ended_running_at, a.first_seen_at, \
     a.last_seen_at, a.body_text, a.headline, a.description, a.cta_type, a.cta_text, \
     a.landing_url, a.destination_domain, a.display_format, a.country_codes, a.language_codes, \
     a.raw_json, a.created_at, a.updated_at";

/// Returns up to `limit` ads with no `ad_creative_memberships` row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ads_missing_creative(pool: &PgPool, limit: i64) -> Result<Vec<AdRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {AD_COLUMNS_QUALIFIED} \
         FROM ads a \
         LEFT JOIN ad_creative_memberships m ON m.ad_id = a.id \
         WHERE m.id IS NULL \
         ORDER BY a.id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns up to `limit` ads with no `ad_facts` row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ads_missing_facts(pool: &PgPool, limit: i64) -> Result<Vec<AdRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {AD_COLUMNS_QUALIFIED} \
         FROM ads a \
         LEFT JOIN ad_facts f ON f.ad_id = a.id \
         WHERE f.id IS NULL \
         ORDER BY a.id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns up to `limit` ads with no `ad_scores` row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ads_missing_score(pool: &PgPool, limit: i64) -> Result<Vec<AdRow>, DbError> {
    let rows = sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {AD_COLUMNS_QUALIFIED} \
         FROM ads a \
         LEFT JOIN ad_scores s ON s.ad_id = a.id \
         WHERE s.id IS NULL \
         ORDER BY a.id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
