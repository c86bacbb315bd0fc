//! Database operations for `research_runs`, `research_run_brands`, and
//! `ad_ingest_runs`.
//!
//! An ad ingest run is one provider-call attempt for one brand identity and
//! is the externally visible audit trail of ingestion: consumers poll these
//! rows rather than receiving push notifications.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Hard cap on persisted error text; longer messages are truncated on a
/// char boundary before the write.
pub const MAX_ERROR_MESSAGE_LEN: usize = 5000;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `research_runs` table: one investigation of a set of
/// brands for one product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResearchRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub org_id: Uuid,
    pub product_id: Option<i64>,
    pub purpose: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A row from the `research_run_brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResearchRunBrandRow {
    pub id: i64,
    pub research_run_id: i64,
    pub brand_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A row from the `ad_ingest_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdIngestRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub research_run_id: Option<i64>,
    pub brand_channel_identity_id: Option<i64>,
    pub provider: String,
    pub provider_run_id: Option<String>,
    pub provider_dataset_id: Option<String>,
    pub status: String,
    pub is_partial: bool,
    pub empty_reason: Option<String>,
    pub items_total: i32,
    pub items_succeeded: i32,
    pub items_failed: i32,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`create_ad_ingest_run`].
#[derive(Debug, Clone)]
pub struct NewAdIngestRun<'a> {
    pub research_run_id: Option<i64>,
    pub brand_channel_identity_id: Option<i64>,
    pub provider: &'a str,
    pub provider_run_id: Option<&'a str>,
    pub provider_dataset_id: Option<&'a str>,
}

/// Why an ingest run ended with zero processed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The provider call succeeded but returned no ads.
    ProviderReturnedNothing,
    /// The provider returned ads but every one failed to upsert.
    AllItemsFailed,
}

impl EmptyReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EmptyReason::ProviderReturnedNothing => "provider_returned_nothing",
            EmptyReason::AllItemsFailed => "all_items_failed",
        }
    }
}

const INGEST_RUN_COLUMNS: &str = "id, public_id, research_run_id, brand_channel_identity_id, \
     provider, provider_run_id, provider_dataset_id, status, is_partial, empty_reason, \
     items_total, items_succeeded, items_failed, error_message, \
     started_at, completed_at, created_at";

// ---------------------------------------------------------------------------
// research_runs operations
// ---------------------------------------------------------------------------

/// Creates a research run in `running` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_research_run(
    pool: &PgPool,
    org_id: Uuid,
    product_id: Option<i64>,
    purpose: &str,
) -> Result<ResearchRunRow, DbError> {
    let row = sqlx::query_as::<_, ResearchRunRow>(
        "INSERT INTO research_runs (org_id, product_id, purpose, status) \
         VALUES ($1, $2, $3, 'running') \
         RETURNING id, public_id, org_id, product_id, purpose, status, created_at, completed_at",
    )
    .bind(org_id)
    .bind(product_id)
    .bind(purpose)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a research run `completed` and stamps `completed_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_research_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE research_runs \
         SET status = 'completed', completed_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts or updates the per-brand scope row for a research run.
/// Conflicts on `(research_run_id, brand_id)` update `status` in place —
/// re-scoping a brand never accumulates rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_research_run_brand(
    pool: &PgPool,
    research_run_id: i64,
    brand_id: i64,
    status: &str,
) -> Result<ResearchRunBrandRow, DbError> {
    let row = sqlx::query_as::<_, ResearchRunBrandRow>(
        "INSERT INTO research_run_brands (research_run_id, brand_id, status) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (research_run_id, brand_id) DO UPDATE SET \
             status = EXCLUDED.status \
         RETURNING id, research_run_id, brand_id, status, created_at",
    )
    .bind(research_run_id)
    .bind(brand_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// ad_ingest_runs operations
// ---------------------------------------------------------------------------

/// Creates a new ad ingest run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_ad_ingest_run(
    pool: &PgPool,
    run: &NewAdIngestRun<'_>,
) -> Result<AdIngestRunRow, DbError> {
    let row = sqlx::query_as::<_, AdIngestRunRow>(&format!(
        "INSERT INTO ad_ingest_runs \
             (research_run_id, brand_channel_identity_id, provider, \
              provider_run_id, provider_dataset_id, status) \
         VALUES ($1, $2, $3, $4, $5, 'queued') \
         RETURNING {INGEST_RUN_COLUMNS}"
    ))
    .bind(run.research_run_id)
    .bind(run.brand_channel_identity_id)
    .bind(run.provider)
    .bind(run.provider_run_id)
    .bind(run.provider_dataset_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestRunTransition`] if the run is not
/// `queued`, or [`DbError::Sqlx`] if the update fails.
pub async fn start_ad_ingest_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ad_ingest_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a running run as finished with item counts.
///
/// The terminal status is `partial` when any item failed or the provider
/// reported a truncated result set, else `succeeded`.
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_ad_ingest_run(
    pool: &PgPool,
    id: i64,
    items_total: i32,
    items_succeeded: i32,
    items_failed: i32,
    is_partial: bool,
) -> Result<(), DbError> {
    let status = if items_failed > 0 || is_partial {
        "partial"
    } else {
        "succeeded"
    };

    let result = sqlx::query(
        "UPDATE ad_ingest_runs \
         SET status = $1, is_partial = $2, items_total = $3, \
             items_succeeded = $4, items_failed = $5, completed_at = NOW() \
         WHERE id = $6 AND status = 'running'",
    )
    .bind(status)
    .bind(is_partial)
    .bind(items_total)
    .bind(items_succeeded)
    .bind(items_failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running run as `empty` with an explicit reason code, so "the
/// provider returned nothing" is distinguishable from "every item failed".
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn mark_ad_ingest_run_empty(
    pool: &PgPool,
    id: i64,
    reason: EmptyReason,
    items_total: i32,
    items_failed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ad_ingest_runs \
         SET status = 'empty', empty_reason = $1, items_total = $2, \
             items_succeeded = 0, items_failed = $3, completed_at = NOW() \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(reason.as_str())
    .bind(items_total)
    .bind(items_failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with truncated error text.
///
/// # Errors
///
/// Returns [`DbError::InvalidIngestRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_ad_ingest_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE ad_ingest_runs \
         SET status = 'failed', error_message = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(truncate_error(error_message))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidIngestRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single ingest run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ad_ingest_run(pool: &PgPool, id: i64) -> Result<AdIngestRunRow, DbError> {
    let row = sqlx::query_as::<_, AdIngestRunRow>(&format!(
        "SELECT {INGEST_RUN_COLUMNS} \
         FROM ad_ingest_runs \
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` ingest runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ad_ingest_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<AdIngestRunRow>, DbError> {
    let rows = sqlx::query_as::<_, AdIngestRunRow>(&format!(
        "SELECT {INGEST_RUN_COLUMNS} \
         FROM ad_ingest_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn truncate_error(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    let mut end = MAX_ERROR_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_error_short_message_unchanged() {
        assert_eq!(truncate_error("boom"), "boom");
    }

    #[test]
    fn truncate_error_caps_at_limit() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 100);
        assert_eq!(truncate_error(&long).len(), MAX_ERROR_MESSAGE_LEN);
    }

    #[test]
    fn truncate_error_respects_char_boundaries() {
        // Fill right up to the limit with multibyte chars so a naive byte
        // slice would split one in half.
        let long = "é".repeat(MAX_ERROR_MESSAGE_LEN);
        let truncated = truncate_error(&long);
        assert!(truncated.len() <= MAX_ERROR_MESSAGE_LEN);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn empty_reason_codes_are_stable() {
        assert_eq!(
            EmptyReason::ProviderReturnedNothing.as_str(),
            "provider_returned_nothing"
        );
        assert_eq!(EmptyReason::AllItemsFailed.as_str(), "all_items_failed");
    }
}
