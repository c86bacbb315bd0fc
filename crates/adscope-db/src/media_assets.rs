//! Database operations for `media_assets` and `ad_asset_links`.
//!
//! A media asset is one physical image or video. The dedup key is the
//! content hash when the adapter downloaded the bytes, else the
//! `(channel, source_url)` pair. Both paths resolve duplicate-insert races
//! through unique indexes, never through locks held across the ingestion
//! call.

use adscope_core::{infer_mime_type, NormalizedAsset};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `media_assets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaAssetRow {
    pub id: i64,
    pub channel: String,
    pub asset_kind: String,
    pub sha256: Option<String>,
    pub source_url: Option<String>,
    pub stored_url: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_seconds: Option<f64>,
    pub mirror_status: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A media asset joined with its link to one ad. `link_id` preserves link
/// creation order so primary-asset selection is deterministic.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkedMediaRow {
    pub link_id: i64,
    pub role: String,
    pub id: i64,
    pub channel: String,
    pub asset_kind: String,
    pub sha256: Option<String>,
    pub source_url: Option<String>,
    pub stored_url: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_seconds: Option<f64>,
    pub mirror_status: String,
    pub metadata: serde_json::Value,
}

const MEDIA_COLUMNS: &str = "id, channel, asset_kind, sha256, source_url, stored_url, mime_type, \
     size_bytes, width, height, duration_seconds, mirror_status, metadata, created_at, updated_at";

// ---------------------------------------------------------------------------
// media_assets operations
// ---------------------------------------------------------------------------

/// Resolve a normalized asset reference to its deduplicated `media_assets`
/// row, creating the row on first sighting.
///
/// Lookup order: an exact `sha256` match when the incoming asset carries a
/// hash, else the `(channel, source_url)` pair. On a hit, metadata merges
/// first-key-wins and null scalar fields fill in (mime type inferred from
/// the URL extension or asset kind when the provider omitted it). On a
/// miss, the insert lands with `mirror_status = 'pending'` for the external
/// mirroring service to pick up.
///
/// Safe to call concurrently for the same hash from two ingestion workers:
/// each path is one `INSERT .. ON CONFLICT .. DO UPDATE .. RETURNING`
/// against the corresponding unique index, so the race resolves to a single
/// row inside the database.
///
/// # Errors
///
/// Returns [`DbError::UnidentifiableMediaAsset`] if the asset has neither a
/// hash nor a source URL, or [`DbError::Sqlx`] if a statement fails.
pub async fn get_or_create_media_asset(
    conn: &mut PgConnection,
    channel: &str,
    asset: &NormalizedAsset,
) -> Result<MediaAssetRow, DbError> {
    let mime_type = asset
        .mime_type
        .clone()
        .or_else(|| infer_mime_type(asset.source_url.as_deref(), &asset.asset_kind));
    let metadata = serde_json::Value::Object(asset.metadata.clone());

    if let Some(sha256) = &asset.sha256 {
        let sha256 = sha256.to_ascii_lowercase();
        let row = sqlx::query_as::<_, MediaAssetRow>(&format!(
            "INSERT INTO media_assets \
                 (channel, asset_kind, sha256, source_url, stored_url, mime_type, \
                  size_bytes, width, height, duration_seconds, mirror_status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11::jsonb) \
             ON CONFLICT (sha256) WHERE sha256 IS NOT NULL DO UPDATE SET \
                 source_url       = COALESCE(media_assets.source_url, EXCLUDED.source_url), \
                 stored_url       = COALESCE(media_assets.stored_url, EXCLUDED.stored_url), \
                 mime_type        = COALESCE(media_assets.mime_type, EXCLUDED.mime_type), \
                 size_bytes       = COALESCE(media_assets.size_bytes, EXCLUDED.size_bytes), \
                 width            = COALESCE(media_assets.width, EXCLUDED.width), \
                 height           = COALESCE(media_assets.height, EXCLUDED.height), \
                 duration_seconds = COALESCE(media_assets.duration_seconds, EXCLUDED.duration_seconds), \
                 metadata         = EXCLUDED.metadata || media_assets.metadata, \
                 updated_at       = NOW() \
             RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(channel)
        .bind(&asset.asset_kind)
        .bind(&sha256)
        .bind(&asset.source_url)
        .bind(&asset.stored_url)
        .bind(&mime_type)
        .bind(asset.size_bytes)
        .bind(asset.width)
        .bind(asset.height)
        .bind(asset.duration_seconds)
        .bind(&metadata)
        .fetch_one(&mut *conn)
        .await?;
        return Ok(row);
    }

    let Some(source_url) = &asset.source_url else {
        return Err(DbError::UnidentifiableMediaAsset);
    };

    // A hashed row may already exist for this URL (bytes were downloaded on
    // an earlier sighting). Prefer it over creating a hashless sibling; the
    // lowest id wins so repeated runs pick the same row.
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM media_assets \
         WHERE channel = $1 AND source_url = $2 \
         ORDER BY id \
         LIMIT 1",
    )
    .bind(channel)
    .bind(source_url)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        let row = sqlx::query_as::<_, MediaAssetRow>(&format!(
            "UPDATE media_assets SET \
                 stored_url       = COALESCE(stored_url, $2), \
                 mime_type        = COALESCE(mime_type, $3), \
                 size_bytes       = COALESCE(size_bytes, $4), \
                 width            = COALESCE(width, $5), \
                 height           = COALESCE(height, $6), \
                 duration_seconds = COALESCE(duration_seconds, $7), \
                 metadata         = $8::jsonb || metadata, \
                 updated_at       = NOW() \
             WHERE id = $1 \
             RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .bind(&asset.stored_url)
        .bind(&mime_type)
        .bind(asset.size_bytes)
        .bind(asset.width)
        .bind(asset.height)
        .bind(asset.duration_seconds)
        .bind(&metadata)
        .fetch_one(&mut *conn)
        .await?;
        return Ok(row);
    }

    let row = sqlx::query_as::<_, MediaAssetRow>(&format!(
        "INSERT INTO media_assets \
             (channel, asset_kind, sha256, source_url, stored_url, mime_type, \
              size_bytes, width, height, duration_seconds, mirror_status, metadata) \
         VALUES ($1, $2, NULL, $3, $4, $5, $6, $7, $8, $9, 'pending', $10::jsonb) \
         ON CONFLICT (channel, source_url) WHERE sha256 IS NULL DO UPDATE SET \
             stored_url       = COALESCE(media_assets.stored_url, EXCLUDED.stored_url), \
             mime_type        = COALESCE(media_assets.mime_type, EXCLUDED.mime_type), \
             size_bytes       = COALESCE(media_assets.size_bytes, EXCLUDED.size_bytes), \
             width            = COALESCE(media_assets.width, EXCLUDED.width), \
             height           = COALESCE(media_assets.height, EXCLUDED.height), \
             duration_seconds = COALESCE(media_assets.duration_seconds, EXCLUDED.duration_seconds), \
             metadata         = EXCLUDED.metadata || media_assets.metadata, \
             updated_at       = NOW() \
         RETURNING {MEDIA_COLUMNS}"
    ))
    .bind(channel)
    .bind(&asset.asset_kind)
    .bind(source_url)
    .bind(&asset.stored_url)
    .bind(&mime_type)
    .bind(asset.size_bytes)
    .bind(asset.width)
    .bind(asset.height)
    .bind(asset.duration_seconds)
    .bind(&metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// ad_asset_links operations
// ---------------------------------------------------------------------------

/// Link an ad to a media asset with a role. A given `(ad_id,
/// media_asset_id)` pair is only ever inserted once; a duplicate link is a
/// no-op. Returns `true` if a new link was created.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn link_ad_asset(
    conn: &mut PgConnection,
    ad_id: i64,
    media_asset_id: i64,
    role: &str,
    position: Option<i32>,
) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "INSERT INTO ad_asset_links (ad_id, media_asset_id, role, position) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (ad_id, media_asset_id) DO NOTHING",
    )
    .bind(ad_id)
    .bind(media_asset_id)
    .bind(role)
    .bind(position)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

/// Returns the media assets linked to an ad, in link creation order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ad_media(pool: &PgPool, ad_id: i64) -> Result<Vec<LinkedMediaRow>, DbError> {
    let rows = sqlx::query_as::<_, LinkedMediaRow>(
        "SELECT l.id AS link_id, l.role, \
                m.id, m.channel, m.asset_kind, m.sha256, m.source_url, m.stored_url, \
                m.mime_type, m.size_bytes, m.width, m.height, m.duration_seconds, \
                m.mirror_status, m.metadata \
         FROM ad_asset_links l \
         JOIN media_assets m ON m.id = l.media_asset_id \
         WHERE l.ad_id = $1 \
         ORDER BY l.id",
    )
    .bind(ad_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns up to `limit` assets still waiting to be mirrored to durable
/// storage. The external mirroring service polls this set.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_media_assets_pending_mirror(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<MediaAssetRow>, DbError> {
    let rows = sqlx::query_as::<_, MediaAssetRow>(&format!(
        "SELECT {MEDIA_COLUMNS} \
         FROM media_assets \
         WHERE mirror_status = 'pending' \
         ORDER BY id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
