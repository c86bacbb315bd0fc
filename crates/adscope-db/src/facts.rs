//! Database operations for the `ad_facts` table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgExecutor;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `ad_facts` table: a denormalized filtering projection of
/// an ad, its brand, and its linked media. Never hand-edited; always
/// recomputable from source rows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdFactsRow {
    pub id: i64,
    pub ad_id: i64,
    pub country_codes: Vec<String>,
    pub language_codes: Vec<String>,
    pub media_types: Vec<String>,
    pub media_count: i32,
    pub days_active: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub video_length_seconds: Option<f64>,
    pub display_format: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The computed projection for one ad, produced by the fact maintainer.
#[derive(Debug, Clone, PartialEq)]
pub struct AdFactsInput {
    pub country_codes: Vec<String>,
    pub language_codes: Vec<String>,
    pub media_types: Vec<String>,
    pub media_count: i32,
    pub days_active: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub video_length_seconds: Option<f64>,
    pub display_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert the facts row for an ad. Every column is overwritten from the
/// freshly computed projection — facts never accumulate, so calling this
/// redundantly is harmless.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad_facts(
    executor: impl PgExecutor<'_>,
    ad_id: i64,
    facts: &AdFactsInput,
) -> Result<AdFactsRow, DbError> {
    let row = sqlx::query_as::<_, AdFactsRow>(
        "INSERT INTO ad_facts \
             (ad_id, country_codes, language_codes, media_types, media_count, \
              days_active, start_date, video_length_seconds, display_format) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (ad_id) DO UPDATE SET \
             country_codes        = EXCLUDED.country_codes, \
             language_codes       = EXCLUDED.language_codes, \
             media_types          = EXCLUDED.media_types, \
             media_count          = EXCLUDED.media_count, \
             days_active          = EXCLUDED.days_active, \
             start_date           = EXCLUDED.start_date, \
             video_length_seconds = EXCLUDED.video_length_seconds, \
             display_format       = EXCLUDED.display_format, \
             updated_at           = NOW() \
         RETURNING id, ad_id, country_codes, language_codes, media_types, media_count, \
                   days_active, start_date, video_length_seconds, display_format, \
                   created_at, updated_at",
    )
    .bind(ad_id)
    .bind(&facts.country_codes)
    .bind(&facts.language_codes)
    .bind(&facts.media_types)
    .bind(facts.media_count)
    .bind(facts.days_active)
    .bind(facts.start_date)
    .bind(facts.video_length_seconds)
    .bind(&facts.display_format)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
