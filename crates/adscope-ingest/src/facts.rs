//! The fact maintainer: a pure projection of an ad and its linked media
//! into the `ad_facts` filtering row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use adscope_db::{AdFactsInput, AdFactsRow, AdRow, DbError, LinkedMediaRow};

/// Build the facts projection for an ad from its current row and linked
/// media. Pure: identical inputs (including `now`) produce identical output,
/// which is what makes the facts upsert idempotent.
#[must_use]
pub fn build_ad_facts(ad: &AdRow, media: &[LinkedMediaRow], now: DateTime<Utc>) -> AdFactsInput {
    let mut media_types: Vec<String> = media.iter().map(|m| m.asset_kind.clone()).collect();
    media_types.sort();
    media_types.dedup();

    let days_active = ad.started_running_at.map(|started| {
        let ended = ad.ended_running_at.unwrap_or(now);
        let days = (ended - started).num_days().max(0);
        i32::try_from(days).unwrap_or(i32::MAX)
    });

    let video_length_seconds = media
        .iter()
        .filter(|m| m.asset_kind == "video")
        .filter_map(|m| m.duration_seconds)
        .fold(None, |acc: Option<f64>, d| {
            Some(acc.map_or(d, |best| best.max(d)))
        });

    let display_format = ad.display_format.clone().or_else(|| {
        if media.iter().any(|m| m.asset_kind == "video") {
            Some("video".to_string())
        } else if media.len() > 1 {
            Some("carousel".to_string())
        } else if media.len() == 1 {
            Some("image".to_string())
        } else {
            None
        }
    });

    AdFactsInput {
        country_codes: ad.country_codes.clone().unwrap_or_default(),
        language_codes: ad.language_codes.clone().unwrap_or_default(),
        media_types,
        media_count: i32::try_from(media.len()).unwrap_or(i32::MAX),
        days_active,
        start_date: ad.started_running_at.map(|t| t.date_naive()),
        video_length_seconds,
        display_format,
    }
}

/// Recompute and upsert the facts row for an ad. Safe to call redundantly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn refresh_ad_facts(
    pool: &PgPool,
    ad: &AdRow,
    media: &[LinkedMediaRow],
) -> Result<AdFactsRow, DbError> {
    let facts = build_ad_facts(ad, media, Utc::now());
    adscope_db::upsert_ad_facts(pool, ad.id, &facts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_ad() -> AdRow {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        AdRow {
            id: 1,
            brand_id: 1,
            brand_channel_identity_id: None,
            channel: "meta".to_string(),
            external_ad_id: "ext-1".to_string(),
            ad_status: Some("active".to_string()),
            started_running_at: None,
            ended_running_at: None,
            first_seen_at: now,
            last_seen_at: now,
            body_text: Some("Save 20% today".to_string()),
            headline: None,
            description: None,
            cta_type: None,
            cta_text: None,
            landing_url: Some("https://shop.example.com/x".to_string()),
            destination_domain: Some("example.com".to_string()),
            display_format: None,
            country_codes: Some(vec!["US".to_string(), "CA".to_string()]),
            language_codes: Some(vec!["en".to_string()]),
            raw_json: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn make_media(link_id: i64, kind: &str, duration: Option<f64>) -> LinkedMediaRow {
        LinkedMediaRow {
            link_id,
            role: "primary".to_string(),
            id: link_id * 10,
            channel: "meta".to_string(),
            asset_kind: kind.to_string(),
            sha256: Some(format!("h{link_id}")),
            source_url: None,
            stored_url: None,
            mime_type: None,
            size_bytes: None,
            width: None,
            height: None,
            duration_seconds: duration,
            mirror_status: "pending".to_string(),
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn days_active_none_without_start() {
        let facts = build_ad_facts(&make_ad(), &[], Utc::now());
        assert!(facts.days_active.is_none());
        assert!(facts.start_date.is_none());
    }

    #[test]
    fn days_active_uses_ended_when_present() {
        let mut ad = make_ad();
        ad.started_running_at = Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap());
        ad.ended_running_at = Some(Utc.with_ymd_and_hms(2026, 7, 15, 0, 0, 0).unwrap());
        // `now` far in the future must not matter once the ad has ended.
        let now = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();
        let facts = build_ad_facts(&ad, &[], now);
        assert_eq!(facts.days_active, Some(14));
        assert_eq!(
            facts.start_date,
            Some(chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap())
        );
    }

    #[test]
    fn days_active_uses_now_for_running_ads() {
        let mut ad = make_ad();
        ad.started_running_at = Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap());
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let facts = build_ad_facts(&ad, &[], now);
        assert_eq!(facts.days_active, Some(30));
    }

    #[test]
    fn days_active_clamps_negative_spans_to_zero() {
        // A provider can report an end before the start; never go negative.
        let mut ad = make_ad();
        ad.started_running_at = Some(Utc.with_ymd_and_hms(2026, 7, 10, 0, 0, 0).unwrap());
        ad.ended_running_at = Some(Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap());
        let facts = build_ad_facts(&ad, &[], Utc::now());
        assert_eq!(facts.days_active, Some(0));
    }

    #[test]
    fn media_types_sorted_and_deduped() {
        let media = vec![
            make_media(1, "video", Some(12.0)),
            make_media(2, "image", None),
            make_media(3, "image", None),
        ];
        let facts = build_ad_facts(&make_ad(), &media, Utc::now());
        assert_eq!(facts.media_types, vec!["image", "video"]);
        assert_eq!(facts.media_count, 3);
    }

    #[test]
    fn video_length_takes_longest_video() {
        let media = vec![
            make_media(1, "video", Some(12.0)),
            make_media(2, "video", Some(30.5)),
            make_media(3, "image", Some(99.0)), // image durations are ignored
        ];
        let facts = build_ad_facts(&make_ad(), &media, Utc::now());
        assert_eq!(facts.video_length_seconds, Some(30.5));
    }

    #[test]
    fn display_format_prefers_ad_value() {
        let mut ad = make_ad();
        ad.display_format = Some("carousel".to_string());
        let media = vec![make_media(1, "video", Some(5.0))];
        let facts = build_ad_facts(&ad, &media, Utc::now());
        assert_eq!(facts.display_format.as_deref(), Some("carousel"));
    }

    #[test]
    fn display_format_derived_from_media() {
        let video = vec![make_media(1, "video", Some(5.0))];
        assert_eq!(
            build_ad_facts(&make_ad(), &video, Utc::now())
                .display_format
                .as_deref(),
            Some("video")
        );

        let carousel = vec![make_media(1, "image", None), make_media(2, "image", None)];
        assert_eq!(
            build_ad_facts(&make_ad(), &carousel, Utc::now())
                .display_format
                .as_deref(),
            Some("carousel")
        );

        let single = vec![make_media(1, "image", None)];
        assert_eq!(
            build_ad_facts(&make_ad(), &single, Utc::now())
                .display_format
                .as_deref(),
            Some("image")
        );

        assert!(build_ad_facts(&make_ad(), &[], Utc::now())
            .display_format
            .is_none());
    }

    #[test]
    fn projection_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let media = vec![make_media(1, "image", None)];
        let a = build_ad_facts(&make_ad(), &media, now);
        let b = build_ad_facts(&make_ad(), &media, now);
        assert_eq!(a, b);
    }
}
