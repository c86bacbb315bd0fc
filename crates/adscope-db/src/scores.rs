//! Database operations for the `ad_scores` table.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `ad_scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdScoreRow {
    pub id: i64,
    pub ad_id: i64,
    pub performance_score: f64,
    pub winning_score: f64,
    pub confidence: f64,
    pub score_version: String,
    pub score_breakdown: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The computed score for one ad, produced by the score maintainer.
/// `score_breakdown` records every component input so a score is
/// explainable after the fact.
#[derive(Debug, Clone, PartialEq)]
pub struct AdScoreInput {
    pub performance_score: f64,
    pub winning_score: f64,
    pub confidence: f64,
    pub score_version: String,
    pub score_breakdown: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert the score row for an ad, overwriting every scored column.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ad_score(
    executor: impl PgExecutor<'_>,
    ad_id: i64,
    score: &AdScoreInput,
) -> Result<AdScoreRow, DbError> {
    let row = sqlx::query_as::<_, AdScoreRow>(
        "INSERT INTO ad_scores \
             (ad_id, performance_score, winning_score, confidence, score_version, score_breakdown) \
         VALUES ($1, $2, $3, $4, $5, $6::jsonb) \
         ON CONFLICT (ad_id) DO UPDATE SET \
             performance_score = EXCLUDED.performance_score, \
             winning_score     = EXCLUDED.winning_score, \
             confidence        = EXCLUDED.confidence, \
             score_version     = EXCLUDED.score_version, \
             score_breakdown   = EXCLUDED.score_breakdown, \
             updated_at        = NOW() \
         RETURNING id, ad_id, performance_score, winning_score, confidence, \
                   score_version, score_breakdown, created_at, updated_at",
    )
    .bind(ad_id)
    .bind(score.performance_score)
    .bind(score.winning_score)
    .bind(score.confidence)
    .bind(&score.score_version)
    .bind(&score.score_breakdown)
    .fetch_one(executor)
    .await?;

    Ok(row)
}
