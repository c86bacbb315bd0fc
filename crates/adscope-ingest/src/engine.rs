//! The ad upsert engine: the per-ad unit of isolation for ingestion.
//!
//! One call handles one normalized ad end to end: the ad row and its asset
//! links commit atomically, then creative membership, facts, and score are
//! refreshed as convergent upserts. A failure in any derived stage surfaces
//! with the ad's natural key attached but leaves the committed ad/media
//! state intact — the backfill jobs converge whatever is missing.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use adscope_core::{derive_primary_domain, NormalizedAd};
use adscope_db::{AdRow, LinkedMediaRow};

use crate::creative::sync_creative_membership;
use crate::error::IngestError;
use crate::facts::build_ad_facts;
use crate::score::compute_ad_score;

/// Identity context for one ad upsert, resolved once per brand identity
/// before the ad loop starts.
#[derive(Debug, Clone)]
pub struct AdUpsertContext {
    pub org_id: Uuid,
    pub brand_id: i64,
    pub brand_channel_identity_id: Option<i64>,
    pub channel: String,
}

/// The committed result of one ad upsert.
#[derive(Debug, Clone)]
pub struct UpsertedAd {
    pub ad: AdRow,
    pub media: Vec<LinkedMediaRow>,
    pub ad_creative_id: i64,
}

/// Upsert one normalized ad with its media, creative membership, facts, and
/// score.
///
/// Write order within the ad is fixed — ad row, asset links, creative,
/// facts, score — because each stage reads the previous stage's committed
/// state. The ad row and its links are one transaction; a crash mid-ad
/// rolls that back and never leaves a partially-linked ad. Failures on one
/// ad never affect ads already committed by the same run.
///
/// # Errors
///
/// Returns [`IngestError::MissingExternalAdId`] before any write when the
/// record has no natural key, or [`IngestError::AdPipeline`] with the ad's
/// `(channel, external_ad_id)` and the failing stage for store errors.
pub async fn upsert_ad_with_assets(
    pool: &PgPool,
    ctx: &AdUpsertContext,
    ad: &NormalizedAd,
) -> Result<UpsertedAd, IngestError> {
    if !ad.has_external_id() {
        return Err(IngestError::MissingExternalAdId);
    }
    let ext_id = ad.external_ad_id.as_str();

    let destination_domain = ad.landing_url.as_deref().and_then(derive_primary_domain);

    // Stage 1: ad row + media links, atomically.
    let mut tx = pool
        .begin()
        .await
        .map_err(adscope_db::DbError::from)
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "ad_upsert"))?;

    let ad_row = adscope_db::upsert_ad(
        &mut tx,
        ctx.brand_id,
        ctx.brand_channel_identity_id,
        &ctx.channel,
        ad,
        destination_domain.as_deref(),
    )
    .await
    .map_err(IngestError::at_stage(&ctx.channel, ext_id, "ad_upsert"))?;

    for asset in &ad.assets {
        if !asset.is_identifiable() {
            tracing::warn!(
                channel = %ctx.channel,
                external_ad_id = %ext_id,
                asset_kind = %asset.asset_kind,
                "skipping asset with no sha256 and no source_url"
            );
            continue;
        }

        let media = adscope_db::get_or_create_media_asset(&mut tx, &ctx.channel, asset)
            .await
            .map_err(IngestError::at_stage(&ctx.channel, ext_id, "media_dedup"))?;

        adscope_db::link_ad_asset(&mut tx, ad_row.id, media.id, &asset.role, asset.position)
            .await
            .map_err(IngestError::at_stage(&ctx.channel, ext_id, "asset_link"))?;
    }

    tx.commit()
        .await
        .map_err(adscope_db::DbError::from)
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "ad_upsert"))?;

    // Stage 2: derived state, each a convergent upsert over committed rows.
    let media = adscope_db::list_ad_media(pool, ad_row.id)
        .await
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "media_load"))?;

    let creative = sync_creative_membership(pool, ctx.org_id, &ad_row, &media)
        .await
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "creative_sync"))?;

    let facts = build_ad_facts(&ad_row, &media, Utc::now());
    adscope_db::upsert_ad_facts(pool, ad_row.id, &facts)
        .await
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "facts"))?;

    let score = compute_ad_score(&ad_row, &facts);
    adscope_db::upsert_ad_score(pool, ad_row.id, &score)
        .await
        .map_err(IngestError::at_stage(&ctx.channel, ext_id, "score"))?;

    Ok(UpsertedAd {
        ad: ad_row,
        media,
        ad_creative_id: creative.id,
    })
}
