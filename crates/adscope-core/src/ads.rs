use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Link role for the main asset of an ad. Carousel slides and video
/// thumbnails carry their own role strings from the adapter.
pub const ROLE_PRIMARY: &str = "primary";

/// An ad record scraped from a provider's ad library, normalized by a
/// scraping adapter for storage and dedup across providers.
///
/// Adapters own the provider wire format; everything downstream of them
/// sees only this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedAd {
    /// Provider-assigned ad id, globally unique per channel.
    pub external_ad_id: String,
    /// Provider-reported delivery status (e.g. `"active"`, `"inactive"`).
    pub ad_status: Option<String>,
    pub started_running_at: Option<DateTime<Utc>>,
    pub ended_running_at: Option<DateTime<Utc>>,
    /// When a scraper first observed this ad, if the adapter knows.
    pub first_seen_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub body_text: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    /// Provider CTA identifier (e.g. `"SHOP_NOW"`).
    pub cta_type: Option<String>,
    /// Rendered CTA label (e.g. `"Shop now"`).
    pub cta_text: Option<String>,
    pub landing_url: Option<String>,
    /// Provider-reported format (`"video"`, `"carousel"`, `"image"`), when known.
    pub display_format: Option<String>,
    /// ISO 3166-1 alpha-2 delivery countries.
    #[serde(default)]
    pub country_codes: Vec<String>,
    /// ISO 639-1 copy languages.
    #[serde(default)]
    pub language_codes: Vec<String>,
    /// Full provider payload, retained verbatim for re-processing.
    #[serde(default)]
    pub raw_json: Value,
    #[serde(default)]
    pub assets: Vec<NormalizedAsset>,
}

impl NormalizedAd {
    /// Returns `true` if the record carries a usable natural key.
    #[must_use]
    pub fn has_external_id(&self) -> bool {
        !self.external_ad_id.trim().is_empty()
    }

    /// Returns `true` if any copy field is present.
    #[must_use]
    pub fn has_copy(&self) -> bool {
        self.body_text.is_some()
            || self.headline.is_some()
            || self.description.is_some()
            || self.cta_text.is_some()
    }
}

/// One media reference attached to a [`NormalizedAd`].
///
/// `sha256` is present when the adapter downloaded the bytes; URL-only
/// references are deduped by `(channel, source_url)` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedAsset {
    /// `"image"` or `"video"`.
    pub asset_kind: String,
    /// Link role, defaults to [`ROLE_PRIMARY`].
    #[serde(default = "default_role")]
    pub role: String,
    /// Slide index for carousel ads.
    pub position: Option<i32>,
    /// Lowercase hex digest of the asset bytes, when known.
    pub sha256: Option<String>,
    pub source_url: Option<String>,
    /// Durable-storage URL once the asset has been mirrored.
    pub stored_url: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_seconds: Option<f64>,
    /// Free-form provider metadata, merged first-key-wins on re-sighting.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_role() -> String {
    ROLE_PRIMARY.to_string()
}

impl NormalizedAsset {
    /// Returns `true` if the asset can be identified at all (by hash or URL).
    #[must_use]
    pub fn is_identifiable(&self) -> bool {
        self.sha256.is_some() || self.source_url.is_some()
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.asset_kind == "video"
    }
}

/// Infer a MIME type for an asset the provider shipped without one.
///
/// Checks the source URL extension first, then falls back to a generic type
/// for the asset kind. Returns `None` when neither yields an answer.
#[must_use]
pub fn infer_mime_type(source_url: Option<&str>, asset_kind: &str) -> Option<String> {
    if let Some(url) = source_url {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path.rsplit('.').next().map(str::to_ascii_lowercase);
        let by_ext = match ext.as_deref() {
            Some("jpg" | "jpeg") => Some("image/jpeg"),
            Some("png") => Some("image/png"),
            Some("gif") => Some("image/gif"),
            Some("webp") => Some("image/webp"),
            Some("mp4") => Some("video/mp4"),
            Some("webm") => Some("video/webm"),
            Some("mov") => Some("video/quicktime"),
            _ => None,
        };
        if let Some(mime) = by_ext {
            return Some(mime.to_string());
        }
    }

    match asset_kind {
        "image" => Some("image/jpeg".to_string()),
        "video" => Some("video/mp4".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_asset(sha256: Option<&str>, source_url: Option<&str>) -> NormalizedAsset {
        NormalizedAsset {
            asset_kind: "image".to_string(),
            role: ROLE_PRIMARY.to_string(),
            position: None,
            sha256: sha256.map(str::to_string),
            source_url: source_url.map(str::to_string),
            stored_url: None,
            mime_type: None,
            size_bytes: None,
            width: None,
            height: None,
            duration_seconds: None,
            metadata: Map::new(),
        }
    }

    fn make_ad(external_ad_id: &str) -> NormalizedAd {
        NormalizedAd {
            external_ad_id: external_ad_id.to_string(),
            ad_status: Some("active".to_string()),
            started_running_at: None,
            ended_running_at: None,
            first_seen_at: None,
            last_seen_at: None,
            body_text: Some("Save 20% today".to_string()),
            headline: None,
            description: None,
            cta_type: Some("SHOP_NOW".to_string()),
            cta_text: Some("Shop now".to_string()),
            landing_url: Some("https://shop.example.com/x".to_string()),
            display_format: None,
            country_codes: vec!["US".to_string()],
            language_codes: vec!["en".to_string()],
            raw_json: json!({}),
            assets: vec![],
        }
    }

    #[test]
    fn has_external_id_rejects_blank() {
        assert!(make_ad("ext-1").has_external_id());
        assert!(!make_ad("").has_external_id());
        assert!(!make_ad("   ").has_external_id());
    }

    #[test]
    fn has_copy_true_with_body_only() {
        let mut ad = make_ad("ext-1");
        ad.cta_text = None;
        ad.cta_type = None;
        assert!(ad.has_copy());
    }

    #[test]
    fn has_copy_false_when_all_copy_absent() {
        let mut ad = make_ad("ext-1");
        ad.body_text = None;
        ad.headline = None;
        ad.description = None;
        ad.cta_text = None;
        assert!(!ad.has_copy());
    }

    #[test]
    fn asset_identifiable_by_hash_or_url() {
        assert!(make_asset(Some("ab12"), None).is_identifiable());
        assert!(make_asset(None, Some("https://cdn.example.com/a.jpg")).is_identifiable());
        assert!(!make_asset(None, None).is_identifiable());
    }

    #[test]
    fn infer_mime_type_from_extension() {
        assert_eq!(
            infer_mime_type(Some("https://cdn.example.com/a.JPG?sig=1"), "image").as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            infer_mime_type(Some("https://cdn.example.com/clip.mp4"), "video").as_deref(),
            Some("video/mp4")
        );
    }

    #[test]
    fn infer_mime_type_falls_back_to_asset_kind() {
        assert_eq!(
            infer_mime_type(Some("https://cdn.example.com/asset"), "video").as_deref(),
            Some("video/mp4")
        );
        assert_eq!(infer_mime_type(None, "image").as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn infer_mime_type_unknown_kind_is_none() {
        assert!(infer_mime_type(None, "html").is_none());
    }

    #[test]
    fn normalized_ad_ndjson_roundtrip() {
        let mut ad = make_ad("ext-1");
        ad.assets.push(make_asset(Some("deadbeef"), None));
        let line = serde_json::to_string(&ad).expect("serialization failed");
        let decoded: NormalizedAd = serde_json::from_str(&line).expect("deserialization failed");
        assert_eq!(decoded.external_ad_id, "ext-1");
        assert_eq!(decoded.assets.len(), 1);
        assert_eq!(decoded.assets[0].sha256.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn normalized_ad_deserializes_with_minimal_fields() {
        // Adapters may omit every optional field; serde defaults must hold.
        let decoded: NormalizedAd = serde_json::from_str(
            r#"{"external_ad_id":"ext-9","ad_status":null,"started_running_at":null,
                "ended_running_at":null,"first_seen_at":null,"last_seen_at":null,
                "body_text":null,"headline":null,"description":null,"cta_type":null,
                "cta_text":null,"landing_url":null,"display_format":null}"#,
        )
        .expect("minimal record should deserialize");
        assert!(decoded.assets.is_empty());
        assert!(decoded.country_codes.is_empty());
        assert!(decoded.raw_json.is_null());
    }
}
