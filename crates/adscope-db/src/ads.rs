//! Database operations for the `ads` table.
//!
//! One row per `(channel, external_ad_id)` — the provider-assigned natural
//! key. Re-sighting an ad applies a per-field merge policy: volatile fields
//! (`ad_status`, `last_seen_at`, `ended_running_at`, `raw_json`) take the
//! latest value, durable fields (copy, CTA, landing URL, start timestamps,
//! delivery codes) keep the first non-null value ever seen. Ads are never
//! deleted by the pipeline.

use adscope_core::NormalizedAd;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `ads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdRow {
    pub id: i64,
    pub brand_id: i64,
    pub brand_channel_identity_id: Option<i64>,
    pub channel: String,
    pub external_ad_id: String,
    pub ad_status: Option<String>,
    pub started_running_at: Option<DateTime<Utc>>,
    pub ended_running_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub body_text: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub cta_type: Option<String>,
    pub cta_text: Option<String>,
    pub landing_url: Option<String>,
    pub destination_domain: Option<String>,
    pub display_format: Option<String>,
    pub country_codes: Option<Vec<String>>,
    pub language_codes: Option<Vec<String>>,
    pub raw_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const AD_COLUMNS: &str = "id, brand_id, brand_channel_identity_id, channel, external_ad_id, \
     ad_status, started_running_at, ended_running_at, first_seen_at, last_seen_at, \
     body_text, headline, description, cta_type, cta_text, landing_url, \
     destination_domain, display_format, country_codes, language_codes, raw_json, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert an ad by its `(channel, external_ad_id)` natural key.
///
/// The whole merge policy lives in one `INSERT .. ON CONFLICT .. DO UPDATE
/// .. RETURNING` statement so two workers racing on the same key converge
/// without a read-then-write window:
///
/// - insert path: `first_seen_at` falls back through the incoming
///   `first_seen_at`, then `last_seen_at`, then `NOW()`;
/// - conflict path: volatile columns take `EXCLUDED` values, durable
///   columns take `COALESCE(ads.<col>, EXCLUDED.<col>)` — first-non-null
///   wins, and `first_seen_at` is never touched after insert.
///
/// Empty country/language vectors are bound as NULL so a later sighting
/// that does carry codes can still fill them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad(
    conn: &mut PgConnection,
    brand_id: i64,
    brand_channel_identity_id: Option<i64>,
    channel: &str,
    ad: &NormalizedAd,
    destination_domain: Option<&str>,
) -> Result<AdRow, DbError> {
    let country_codes = (!ad.country_codes.is_empty()).then_some(&ad.country_codes);
    let language_codes = (!ad.language_codes.is_empty()).then_some(&ad.language_codes);
    let raw_json = if ad.raw_json.is_null() {
        serde_json::json!({})
    } else {
        ad.raw_json.clone()
    };

    let row = sqlx::query_as::<_, AdRow>(&format!(
        "INSERT INTO ads \
             (brand_id, brand_channel_identity_id, channel, external_ad_id, ad_status, \
              started_running_at, ended_running_at, first_seen_at, last_seen_at, \
              body_text, headline, description, cta_type, cta_text, landing_url, \
              destination_domain, display_format, country_codes, language_codes, raw_json) \
         VALUES ($1, $2, $3, $4, $5, \
                 $6, $7, COALESCE($8, $9, NOW()), COALESCE($9, NOW()), \
                 $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19, $20::jsonb) \
         ON CONFLICT (channel, external_ad_id) DO UPDATE SET \
             ad_status                 = EXCLUDED.ad_status, \
             last_seen_at              = EXCLUDED.last_seen_at, \
             ended_running_at          = EXCLUDED.ended_running_at, \
             raw_json                  = EXCLUDED.raw_json, \
             started_running_at        = COALESCE(ads.started_running_at, EXCLUDED.started_running_at), \
             body_text                 = COALESCE(ads.body_text, EXCLUDED.body_text), \
             headline                  = COALESCE(ads.headline, EXCLUDED.headline), \
             description               = COALESCE(ads.description, EXCLUDED.description), \
             cta_type                  = COALESCE(ads.cta_type, EXCLUDED.cta_type), \
             cta_text                  = COALESCE(ads.cta_text, EXCLUDED.cta_text), \
             landing_url               = COALESCE(ads.landing_url, EXCLUDED.landing_url), \
             destination_domain        = COALESCE(ads.destination_domain, EXCLUDED.destination_domain), \
             display_format            = COALESCE(ads.display_format, EXCLUDED.display_format), \
             country_codes             = COALESCE(ads.country_codes, EXCLUDED.country_codes), \
             language_codes            = COALESCE(ads.language_codes, EXCLUDED.language_codes), \
             brand_channel_identity_id = COALESCE(ads.brand_channel_identity_id, EXCLUDED.brand_channel_identity_id), \
             updated_at                = NOW() \
         RETURNING {AD_COLUMNS}"
    ))
    .bind(brand_id)
    .bind(brand_channel_identity_id)
    .bind(channel)
    .bind(&ad.external_ad_id)
    .bind(&ad.ad_status)
    .bind(ad.started_running_at)
    .bind(ad.ended_running_at)
    .bind(ad.first_seen_at)
    .bind(ad.last_seen_at)
    .bind(&ad.body_text)
    .bind(&ad.headline)
    .bind(&ad.description)
    .bind(&ad.cta_type)
    .bind(&ad.cta_text)
    .bind(&ad.landing_url)
    .bind(destination_domain)
    .bind(&ad.display_format)
    .bind(country_codes)
    .bind(language_codes)
    .bind(&raw_json)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Returns an ad by its natural key, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_ad_by_natural_key(
    pool: &PgPool,
    channel: &str,
    external_ad_id: &str,
) -> Result<Option<AdRow>, DbError> {
    let row = sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {AD_COLUMNS} \
         FROM ads \
         WHERE channel = $1 AND external_ad_id = $2"
    ))
    .bind(channel)
    .bind(external_ad_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
