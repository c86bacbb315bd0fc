//! The score maintainer: a deterministic component model over an ad and its
//! facts projection.
//!
//! The score is a pure function of its inputs — recomputing with unchanged
//! inputs yields byte-identical output, so the upsert is a safe no-op under
//! redundant calls. The breakdown records every component so a stored score
//! can be explained (and re-derived) later.

use serde_json::json;

use adscope_db::{AdFactsInput, AdRow, AdScoreInput};

/// Version tag stored in `ad_scores.score_version`. Bump on any change to
/// the component set, weights, or normalization below.
pub const SCORE_VERSION: &str = "v1";

const DAYS_ACTIVE_SATURATION: f64 = 30.0;
const MEDIA_COUNT_SATURATION: f64 = 3.0;
const COUNTRY_COUNT_SATURATION: f64 = 5.0;

/// Compute the performance/winning/confidence scores for an ad.
///
/// Components, each normalized to `[0, 1]`:
/// - `longevity`: days active, saturating at 30 — a long-running ad is a
///   spend signal;
/// - `media_richness`: linked asset count, saturating at 3;
/// - `copy_completeness`: fraction of the five copy slots filled;
/// - `reach`: delivery country count, saturating at 5;
/// - `active`: 1 when the provider reports the ad still delivering.
#[must_use]
pub fn compute_ad_score(ad: &AdRow, facts: &AdFactsInput) -> AdScoreInput {
    let longevity = f64::from(facts.days_active.unwrap_or(0)) / DAYS_ACTIVE_SATURATION;
    let longevity = longevity.clamp(0.0, 1.0);

    let media_richness = (f64::from(facts.media_count) / MEDIA_COUNT_SATURATION).clamp(0.0, 1.0);

    let copy_slots = [
        ad.body_text.is_some(),
        ad.headline.is_some(),
        ad.cta_type.is_some(),
        ad.cta_text.is_some(),
        ad.landing_url.is_some(),
    ];
    let filled = copy_slots.iter().filter(|&&present| present).count();
    #[allow(clippy::cast_precision_loss)]
    let copy_completeness = filled as f64 / copy_slots.len() as f64;

    #[allow(clippy::cast_precision_loss)]
    let reach = (facts.country_codes.len() as f64 / COUNTRY_COUNT_SATURATION).clamp(0.0, 1.0);

    let active = if ad.ad_status.as_deref() == Some("active") {
        1.0
    } else {
        0.0
    };

    let performance_score = 100.0
        * (0.35 * longevity + 0.25 * media_richness + 0.25 * copy_completeness + 0.15 * reach);
    let winning_score =
        100.0 * (0.55 * longevity + 0.20 * media_richness + 0.15 * copy_completeness + 0.10 * active);

    // Confidence reflects how much of the input was actually observed, not
    // how good the ad is.
    let signals = [
        facts.days_active.is_some(),
        facts.media_count > 0,
        filled > 0,
        !facts.country_codes.is_empty(),
    ];
    #[allow(clippy::cast_precision_loss)]
    let confidence = signals.iter().filter(|&&s| s).count() as f64 / signals.len() as f64;

    let score_breakdown = json!({
        "version": SCORE_VERSION,
        "components": {
            "longevity": longevity,
            "media_richness": media_richness,
            "copy_completeness": copy_completeness,
            "reach": reach,
            "active": active,
        },
        "inputs": {
            "days_active": facts.days_active,
            "media_count": facts.media_count,
            "copy_slots_filled": filled,
            "country_count": facts.country_codes.len(),
            "ad_status": ad.ad_status,
        },
        "weights": {
            "performance": {"longevity": 0.35, "media_richness": 0.25, "copy_completeness": 0.25, "reach": 0.15},
            "winning": {"longevity": 0.55, "media_richness": 0.20, "copy_completeness": 0.15, "active": 0.10},
        },
    });

    AdScoreInput {
        performance_score,
        winning_score,
        confidence,
        score_version: SCORE_VERSION.to_string(),
        score_breakdown,
    }
}
