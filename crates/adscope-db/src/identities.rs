//! Database operations for `brand_channel_identities`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

pub const VERIFICATION_UNVERIFIED: &str = "unverified";
pub const VERIFICATION_VERIFIED: &str = "verified";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brand_channel_identities` table: one brand's presence on
/// one ad channel.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandChannelIdentityRow {
    pub id: i64,
    pub brand_id: i64,
    pub channel: String,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub display_name: Option<String>,
    pub verification_status: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`upsert_brand_channel_identity`].
#[derive(Debug, Clone)]
pub struct NewBrandChannelIdentity<'a> {
    pub brand_id: i64,
    pub channel: &'a str,
    pub external_id: Option<&'a str>,
    pub external_url: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub verification_status: &'a str,
    pub metadata: serde_json::Value,
}

const IDENTITY_COLUMNS: &str = "id, brand_id, channel, external_id, external_url, display_name, \
     verification_status, metadata, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Find-or-create a brand's channel identity.
///
/// Keyed on `(brand_id, channel, external_id)` when the provider id is
/// known, else on `(brand_id, channel, external_url)` among id-less rows.
/// On a hit: null scalar fields fill in, metadata merges first-key-wins
/// (`EXCLUDED.metadata || existing` — the existing map wins on conflict),
/// and `verification_status` only advances — a verified identity is never
/// downgraded by a later unverified sighting.
///
/// # Errors
///
/// Returns [`DbError::MissingIdentityKey`] if neither `external_id` nor
/// `external_url` is present, or [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_brand_channel_identity(
    pool: &PgPool,
    identity: &NewBrandChannelIdentity<'_>,
) -> Result<BrandChannelIdentityRow, DbError> {
    let row = if identity.external_id.is_some() {
        sqlx::query_as::<_, BrandChannelIdentityRow>(&format!(
            "INSERT INTO brand_channel_identities \
                 (brand_id, channel, external_id, external_url, display_name, \
                  verification_status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb) \
             ON CONFLICT (brand_id, channel, external_id) WHERE external_id IS NOT NULL DO UPDATE SET \
                 external_url        = COALESCE(brand_channel_identities.external_url, EXCLUDED.external_url), \
                 display_name        = COALESCE(brand_channel_identities.display_name, EXCLUDED.display_name), \
                 verification_status = CASE \
                     WHEN brand_channel_identities.verification_status = 'verified' THEN 'verified' \
                     ELSE EXCLUDED.verification_status END, \
                 metadata            = EXCLUDED.metadata || brand_channel_identities.metadata, \
                 updated_at          = NOW() \
             RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(identity.brand_id)
        .bind(identity.channel)
        .bind(identity.external_id)
        .bind(identity.external_url)
        .bind(identity.display_name)
        .bind(identity.verification_status)
        .bind(&identity.metadata)
        .fetch_one(pool)
        .await?
    } else if identity.external_url.is_some() {
        sqlx::query_as::<_, BrandChannelIdentityRow>(&format!(
            "INSERT INTO brand_channel_identities \
                 (brand_id, channel, external_id, external_url, display_name, \
                  verification_status, metadata) \
             VALUES ($1, $2, NULL, $3, $4, $5, $6::jsonb) \
             ON CONFLICT (brand_id, channel, external_url) WHERE external_id IS NULL DO UPDATE SET \
                 display_name        = COALESCE(brand_channel_identities.display_name, EXCLUDED.display_name), \
                 verification_status = CASE \
                     WHEN brand_channel_identities.verification_status = 'verified' THEN 'verified' \
                     ELSE EXCLUDED.verification_status END, \
                 metadata            = EXCLUDED.metadata || brand_channel_identities.metadata, \
                 updated_at          = NOW() \
             RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(identity.brand_id)
        .bind(identity.channel)
        .bind(identity.external_url)
        .bind(identity.display_name)
        .bind(identity.verification_status)
        .bind(&identity.metadata)
        .fetch_one(pool)
        .await?
    } else {
        return Err(DbError::MissingIdentityKey);
    };

    Ok(row)
}

/// Returns a brand's identity on one channel, or `None` if the brand has no
/// recorded presence there. Brands with several identities on a channel
/// resolve to the oldest row for determinism.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_channel_identity(
    pool: &PgPool,
    brand_id: i64,
    channel: &str,
) -> Result<Option<BrandChannelIdentityRow>, DbError> {
    let row = sqlx::query_as::<_, BrandChannelIdentityRow>(&format!(
        "SELECT {IDENTITY_COLUMNS} \
         FROM brand_channel_identities \
         WHERE brand_id = $1 AND channel = $2 \
         ORDER BY id \
         LIMIT 1"
    ))
    .bind(brand_id)
    .bind(channel)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
