//! Run orchestration for one provider call's worth of normalized ads.
//!
//! The run is not a transaction: each ad commits independently, per-item
//! failures are recorded and skipped, and the `ad_ingest_runs` row is the
//! audit trail consumers poll.

use sqlx::PgPool;
use uuid::Uuid;

use adscope_core::NormalizedAd;
use adscope_db::{EmptyReason, NewAdIngestRun};

use crate::engine::{upsert_ad_with_assets, AdUpsertContext};
use crate::error::IngestError;

/// Everything the runner needs to know about where a batch of ads came
/// from: the resolved identity plus provider traceability ids.
#[derive(Debug, Clone)]
pub struct IngestScope {
    pub org_id: Uuid,
    pub brand_id: i64,
    pub brand_channel_identity_id: Option<i64>,
    pub channel: String,
    pub provider: String,
    pub research_run_id: Option<i64>,
    pub provider_run_id: Option<String>,
    pub provider_dataset_id: Option<String>,
    /// Set by the adapter when the provider truncated the result set.
    pub provider_hit_result_limit: bool,
}

/// Per-item result: the ad's natural key plus either its committed ad id or
/// the error that stopped it.
#[derive(Debug)]
pub struct AdOutcome {
    pub external_ad_id: String,
    pub result: Result<i64, IngestError>,
}

/// Aggregated result of one ingest run.
#[derive(Debug)]
pub struct IngestSummary {
    pub run_id: i64,
    pub items_total: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub outcomes: Vec<AdOutcome>,
}

/// Ingest a batch of normalized ads for one brand identity, driving the
/// `ad_ingest_runs` lifecycle from `queued` to a terminal status.
///
/// Terminal states: `empty`/`provider_returned_nothing` when the adapter
/// produced no ads, `empty`/`all_items_failed` when every ad failed to
/// upsert, `partial` when some items failed or the provider truncated the
/// result set, `succeeded` otherwise. Already-committed ads survive any
/// later failure; cancelling between ads leaves a consistent store.
///
/// # Errors
///
/// Returns [`IngestError`] only for run-level bookkeeping failures (the run
/// row cannot be created or transitioned). Per-ad errors are captured in
/// the returned outcomes, never propagated.
pub async fn ingest_ads(
    pool: &PgPool,
    scope: &IngestScope,
    ads: &[NormalizedAd],
) -> Result<IngestSummary, IngestError> {
    let run = adscope_db::create_ad_ingest_run(
        pool,
        &NewAdIngestRun {
            research_run_id: scope.research_run_id,
            brand_channel_identity_id: scope.brand_channel_identity_id,
            provider: &scope.provider,
            provider_run_id: scope.provider_run_id.as_deref(),
            provider_dataset_id: scope.provider_dataset_id.as_deref(),
        },
    )
    .await?;
    adscope_db::start_ad_ingest_run(pool, run.id).await?;

    if ads.is_empty() {
        adscope_db::mark_ad_ingest_run_empty(
            pool,
            run.id,
            EmptyReason::ProviderReturnedNothing,
            0,
            0,
        )
        .await?;
        tracing::info!(run_id = run.id, provider = %scope.provider, "provider returned no ads");
        return Ok(IngestSummary {
            run_id: run.id,
            items_total: 0,
            items_succeeded: 0,
            items_failed: 0,
            outcomes: Vec::new(),
        });
    }

    let ctx = AdUpsertContext {
        org_id: scope.org_id,
        brand_id: scope.brand_id,
        brand_channel_identity_id: scope.brand_channel_identity_id,
        channel: scope.channel.clone(),
    };

    let mut outcomes: Vec<AdOutcome> = Vec::with_capacity(ads.len());
    for ad in ads {
        let result = match upsert_ad_with_assets(pool, &ctx, ad).await {
            Ok(upserted) => Ok(upserted.ad.id),
            Err(e) => {
                tracing::warn!(
                    channel = %scope.channel,
                    external_ad_id = %ad.external_ad_id,
                    error = %e,
                    "ad upsert failed; continuing run"
                );
                Err(e)
            }
        };
        outcomes.push(AdOutcome {
            external_ad_id: ad.external_ad_id.clone(),
            result,
        });
    }

    let items_total = outcomes.len();
    let items_succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let items_failed = items_total - items_succeeded;

    let total_i32 = i32::try_from(items_total).unwrap_or(i32::MAX);
    let succeeded_i32 = i32::try_from(items_succeeded).unwrap_or(i32::MAX);
    let failed_i32 = i32::try_from(items_failed).unwrap_or(i32::MAX);

    if items_succeeded == 0 {
        adscope_db::mark_ad_ingest_run_empty(
            pool,
            run.id,
            EmptyReason::AllItemsFailed,
            total_i32,
            failed_i32,
        )
        .await?;
    } else {
        adscope_db::complete_ad_ingest_run(
            pool,
            run.id,
            total_i32,
            succeeded_i32,
            failed_i32,
            scope.provider_hit_result_limit,
        )
        .await?;
    }

    tracing::info!(
        run_id = run.id,
        provider = %scope.provider,
        items_total,
        items_succeeded,
        items_failed,
        "ingest run finished"
    );

    Ok(IngestSummary {
        run_id: run.id,
        items_total,
        items_succeeded,
        items_failed,
        outcomes,
    })
}
