//! Database operations for `ad_creatives` and `ad_creative_memberships`.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `ad_creatives` table: the deduplicated concept behind one
/// or more ads that share copy and media content.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdCreativeRow {
    pub id: i64,
    pub org_id: Uuid,
    pub brand_id: i64,
    pub channel: String,
    pub fingerprint_algo: String,
    pub creative_fingerprint: String,
    pub copy_fingerprint: String,
    pub media_fingerprint: String,
    pub primary_media_asset_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `ad_creative_memberships` table. Exactly one per ad;
/// membership is a function of current ad/media state, not history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdCreativeMembershipRow {
    pub id: i64,
    pub ad_id: i64,
    pub ad_creative_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`upsert_ad_creative`].
#[derive(Debug, Clone)]
pub struct NewAdCreative<'a> {
    pub org_id: Uuid,
    pub brand_id: i64,
    pub channel: &'a str,
    pub fingerprint_algo: &'a str,
    pub creative_fingerprint: &'a str,
    pub copy_fingerprint: &'a str,
    pub media_fingerprint: &'a str,
    pub primary_media_asset_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert a creative by its content key
/// `(org_id, brand_id, channel, fingerprint_algo, creative_fingerprint)`.
///
/// On conflict the fingerprint components and `primary_media_asset_id` are
/// refreshed so the row always reflects the latest ad that produced this
/// fingerprint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad_creative(
    conn: &mut PgConnection,
    creative: &NewAdCreative<'_>,
) -> Result<AdCreativeRow, DbError> {
    let row = sqlx::query_as::<_, AdCreativeRow>(
        "INSERT INTO ad_creatives \
             (org_id, brand_id, channel, fingerprint_algo, creative_fingerprint, \
              copy_fingerprint, media_fingerprint, primary_media_asset_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (org_id, brand_id, channel, fingerprint_algo, creative_fingerprint) \
         DO UPDATE SET \
             copy_fingerprint       = EXCLUDED.copy_fingerprint, \
             media_fingerprint      = EXCLUDED.media_fingerprint, \
             primary_media_asset_id = EXCLUDED.primary_media_asset_id, \
             updated_at             = NOW() \
         RETURNING id, org_id, brand_id, channel, fingerprint_algo, creative_fingerprint, \
                   copy_fingerprint, media_fingerprint, primary_media_asset_id, \
                   created_at, updated_at",
    )
    .bind(creative.org_id)
    .bind(creative.brand_id)
    .bind(creative.channel)
    .bind(creative.fingerprint_algo)
    .bind(creative.creative_fingerprint)
    .bind(creative.copy_fingerprint)
    .bind(creative.media_fingerprint)
    .bind(creative.primary_media_asset_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Point an ad at the creative it currently resolves to, overwriting any
/// prior membership. Unique on `ad_id`; re-ingesting recomputes and
/// replaces, never accumulates.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad_creative_membership(
    conn: &mut PgConnection,
    ad_id: i64,
    ad_creative_id: i64,
) -> Result<AdCreativeMembershipRow, DbError> {
    let row = sqlx::query_as::<_, AdCreativeMembershipRow>(
        "INSERT INTO ad_creative_memberships (ad_id, ad_creative_id) \
         VALUES ($1, $2) \
         ON CONFLICT (ad_id) DO UPDATE SET \
             ad_creative_id = EXCLUDED.ad_creative_id, \
             updated_at     = NOW() \
         RETURNING id, ad_id, ad_creative_id, created_at, updated_at",
    )
    .bind(ad_id)
    .bind(ad_creative_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}
