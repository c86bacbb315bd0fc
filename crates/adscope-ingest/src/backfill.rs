//! Convergence backfills for ads missing a derived row.
//!
//! Each job loops over bounded batches of left-join-is-null scans, commits
//! per statement, and stops on an empty batch. Missing-ness is recomputed
//! from current state each scan, so a crashed job resumes correctly with no
//! checkpoint. A row that fails is logged and skipped; if an entire batch
//! fails the job stops instead of rescanning the same stuck rows forever.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use adscope_db::AdRow;

use crate::creative::sync_creative_membership;
use crate::error::IngestError;
use crate::facts::build_ad_facts;
use crate::score::compute_ad_score;

/// Counts reported by one backfill job.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillReport {
    pub processed: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Create creative memberships for ads that have none.
///
/// # Errors
///
/// Returns [`IngestError`] if a batch scan fails; per-row recompute errors
/// are counted in the report instead.
pub async fn backfill_ad_creatives(
    pool: &PgPool,
    batch_size: i64,
) -> Result<BackfillReport, IngestError> {
    let mut report = BackfillReport::default();
    // Brand rows repeat heavily within a batch; cache their org ids.
    let mut org_ids: HashMap<i64, Uuid> = HashMap::new();

    loop {
        let ads = adscope_db::list_ads_missing_creative(pool, batch_size).await?;
        if ads.is_empty() {
            break;
        }
        report.batches += 1;

        let mut batch_failed = 0usize;
        for ad in &ads {
            match backfill_one_creative(pool, ad, &mut org_ids).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    tracing::warn!(ad_id = ad.id, error = %e, "creative backfill failed for ad");
                    batch_failed += 1;
                }
            }
        }
        report.failed += batch_failed;

        if batch_failed == ads.len() {
            tracing::error!(
                batch_failed,
                "entire creative backfill batch failed; stopping"
            );
            break;
        }
    }

    Ok(report)
}

async fn backfill_one_creative(
    pool: &PgPool,
    ad: &AdRow,
    org_ids: &mut HashMap<i64, Uuid>,
) -> Result<(), IngestError> {
    let org_id = match org_ids.get(&ad.brand_id) {
        Some(org_id) => *org_id,
        None => {
            let brand = adscope_db::get_brand(pool, ad.brand_id)
                .await?
                .ok_or(adscope_db::DbError::NotFound)?;
            org_ids.insert(ad.brand_id, brand.org_id);
            brand.org_id
        }
    };

    let media = adscope_db::list_ad_media(pool, ad.id).await?;
    sync_creative_membership(pool, org_id, ad, &media).await?;
    Ok(())
}

/// Create facts rows for ads that have none.
///
/// # Errors
///
/// Returns [`IngestError`] if a batch scan fails; per-row recompute errors
/// are counted in the report instead.
pub async fn backfill_ad_facts(
    pool: &PgPool,
    batch_size: i64,
) -> Result<BackfillReport, IngestError> {
    let mut report = BackfillReport::default();

    loop {
        let ads = adscope_db::list_ads_missing_facts(pool, batch_size).await?;
        if ads.is_empty() {
            break;
        }
        report.batches += 1;

        let mut batch_failed = 0usize;
        for ad in &ads {
            let result = async {
                let media = adscope_db::list_ad_media(pool, ad.id).await?;
                let facts = build_ad_facts(ad, &media, Utc::now());
                adscope_db::upsert_ad_facts(pool, ad.id, &facts).await
            }
            .await;

            match result {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    tracing::warn!(ad_id = ad.id, error = %e, "facts backfill failed for ad");
                    batch_failed += 1;
                }
            }
        }
        report.failed += batch_failed;

        if batch_failed == ads.len() {
            tracing::error!(batch_failed, "entire facts backfill batch failed; stopping");
            break;
        }
    }

    Ok(report)
}

/// Create score rows for ads that have none.
///
/// The facts projection is rebuilt in memory for scoring rather than read
/// from `ad_facts`, so a score backfill works even on ads whose facts row
/// is also still missing.
///
/// # Errors
///
/// Returns [`IngestError`] if a batch scan fails; per-row recompute errors
/// are counted in the report instead.
pub async fn backfill_ad_scores(
    pool: &PgPool,
    batch_size: i64,
) -> Result<BackfillReport, IngestError> {
    let mut report = BackfillReport::default();

    loop {
        let ads = adscope_db::list_ads_missing_score(pool, batch_size).await?;
        if ads.is_empty() {
            break;
        }
        report.batches += 1;

        let mut batch_failed = 0usize;
        for ad in &ads {
            let result = async {
                let media = adscope_db::list_ad_media(pool, ad.id).await?;
                let facts = build_ad_facts(ad, &media, Utc::now());
                let score = compute_ad_score(ad, &facts);
                adscope_db::upsert_ad_score(pool, ad.id, &score).await
            }
            .await;

            match result {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    tracing::warn!(ad_id = ad.id, error = %e, "score backfill failed for ad");
                    batch_failed += 1;
                }
            }
        }
        report.failed += batch_failed;

        if batch_failed == ads.len() {
            tracing::error!(batch_failed, "entire score backfill batch failed; stopping");
            break;
        }
    }

    Ok(report)
}
