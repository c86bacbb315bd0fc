//! Creative membership sync: decide which `ad_creatives` row an ad belongs
//! to, purely from its current copy and linked media — never from ingestion
//! order.

use sqlx::PgPool;
use uuid::Uuid;

use adscope_core::{
    copy_fingerprint, creative_fingerprint, media_fingerprint, CreativeCopy, MediaIdentity,
    FINGERPRINT_ALGO, ROLE_PRIMARY,
};
use adscope_db::{AdCreativeRow, AdRow, DbError, LinkedMediaRow, NewAdCreative};

/// Recompute an ad's creative fingerprint and point its membership row at
/// the resolved creative.
///
/// The creative upsert and the membership overwrite commit in one
/// transaction: an ad is never left pointing at a creative that was rolled
/// back. Because the creative key is content-derived, re-ingesting the same
/// ad — or ingesting a different ad with the same copy and media — always
/// converges on the same row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either upsert fails.
pub async fn sync_creative_membership(
    pool: &PgPool,
    org_id: Uuid,
    ad: &AdRow,
    media: &[LinkedMediaRow],
) -> Result<AdCreativeRow, DbError> {
    let copy = CreativeCopy {
        body_text: ad.body_text.as_deref(),
        headline: ad.headline.as_deref(),
        description: ad.description.as_deref(),
        cta_type: ad.cta_type.as_deref(),
        cta_text: ad.cta_text.as_deref(),
        landing_url: ad.landing_url.as_deref(),
    };
    let copy_fp = copy_fingerprint(&copy);

    let identities: Vec<MediaIdentity> = media.iter().filter_map(media_identity).collect();
    let media_fp = media_fingerprint(&identities);
    let creative_fp = creative_fingerprint(&copy_fp, &media_fp);

    let primary_media_asset_id = select_primary_media(media);

    let mut tx = pool.begin().await?;
    let creative = adscope_db::upsert_ad_creative(
        &mut tx,
        &NewAdCreative {
            org_id,
            brand_id: ad.brand_id,
            channel: &ad.channel,
            fingerprint_algo: FINGERPRINT_ALGO,
            creative_fingerprint: &creative_fp,
            copy_fingerprint: &copy_fp,
            media_fingerprint: &media_fp,
            primary_media_asset_id,
        },
    )
    .await?;
    adscope_db::upsert_ad_creative_membership(&mut tx, ad.id, creative.id).await?;
    tx.commit().await?;

    Ok(creative)
}

/// Content identity of one linked asset: the byte hash when known, else its
/// channel-scoped source URL. Assets with neither are invisible to the
/// fingerprint.
fn media_identity(media: &LinkedMediaRow) -> Option<MediaIdentity> {
    if let Some(sha256) = &media.sha256 {
        return Some(MediaIdentity::Hash(sha256.clone()));
    }
    media.source_url.as_ref().map(|url| MediaIdentity::SourceUrl {
        channel: media.channel.clone(),
        url: url.clone(),
    })
}

/// Pick the ad's primary media asset: prefer role `primary`, tie-break on
/// the lowest link creation order. `media` arrives ordered by link id, so
/// taking the first match is deterministic across runs.
fn select_primary_media(media: &[LinkedMediaRow]) -> Option<i64> {
    media
        .iter()
        .find(|m| m.role == ROLE_PRIMARY)
        .or_else(|| media.first())
        .map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_media(link_id: i64, id: i64, role: &str) -> LinkedMediaRow {
        LinkedMediaRow {
            link_id,
            role: role.to_string(),
            id,
            channel: "meta".to_string(),
            asset_kind: "image".to_string(),
            sha256: Some(format!("h{id}")),
            source_url: None,
            stored_url: None,
            mime_type: None,
            size_bytes: None,
            width: None,
            height: None,
            duration_seconds: None,
            mirror_status: "pending".to_string(),
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn primary_role_wins_over_earlier_links() {
        let media = vec![
            make_media(1, 10, "carousel_slide"),
            make_media(2, 20, "primary"),
        ];
        assert_eq!(select_primary_media(&media), Some(20));
    }

    #[test]
    fn first_primary_wins_among_several() {
        let media = vec![
            make_media(1, 10, "primary"),
            make_media(2, 20, "primary"),
        ];
        assert_eq!(select_primary_media(&media), Some(10));
    }

    #[test]
    fn falls_back_to_first_link_without_primary_role() {
        let media = vec![
            make_media(1, 10, "carousel_slide"),
            make_media(2, 20, "carousel_slide"),
        ];
        assert_eq!(select_primary_media(&media), Some(10));
    }

    #[test]
    fn no_media_means_no_primary() {
        assert_eq!(select_primary_media(&[]), None);
    }

    #[test]
    fn media_identity_prefers_hash_over_url() {
        let mut m = make_media(1, 10, "primary");
        m.source_url = Some("https://cdn.example.com/a.jpg".to_string());
        assert_eq!(
            media_identity(&m),
            Some(MediaIdentity::Hash("h10".to_string()))
        );

        m.sha256 = None;
        assert_eq!(
            media_identity(&m),
            Some(MediaIdentity::SourceUrl {
                channel: "meta".to_string(),
                url: "https://cdn.example.com/a.jpg".to_string(),
            })
        );

        m.source_url = None;
        assert_eq!(media_identity(&m), None);
    }
}
