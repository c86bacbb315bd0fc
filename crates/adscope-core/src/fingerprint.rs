//! Content fingerprints for creative dedup.
//!
//! A creative is identified by what it says and what it shows, not by any
//! provider surface id. Fingerprints are stable hashes over normalized
//! content so that re-ingesting an ad, or ingesting two ads that share copy
//! and media, converges on one `ad_creatives` row regardless of order.

use sha2::{Digest, Sha256};

use crate::url::{normalize_url, strip_tracking_params};

/// Version tag stored in `ad_creatives.fingerprint_algo`. Any change to the
/// normalization or hash layout below must bump this so historical creatives
/// keep their own fingerprint space instead of silently reclustering.
pub const FINGERPRINT_ALGO: &str = "sha256-v1";

/// Field separator inside hashed tuples. A control byte that cannot appear
/// in normalized copy, so `("ab", "c")` and `("a", "bc")` hash differently.
const FIELD_SEP: u8 = 0x1f;

/// The durable copy fields of an ad, borrowed for fingerprinting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreativeCopy<'a> {
    pub body_text: Option<&'a str>,
    pub headline: Option<&'a str>,
    pub description: Option<&'a str>,
    pub cta_type: Option<&'a str>,
    pub cta_text: Option<&'a str>,
    pub landing_url: Option<&'a str>,
}

/// The content identity of one linked media asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaIdentity {
    /// Lowercase hex sha256 of the asset bytes.
    Hash(String),
    /// Fallback identity for assets whose bytes were never hashed.
    SourceUrl { channel: String, url: String },
}

impl MediaIdentity {
    fn key(&self) -> String {
        match self {
            MediaIdentity::Hash(hex) => format!("sha256:{}", hex.to_ascii_lowercase()),
            MediaIdentity::SourceUrl { channel, url } => {
                let canonical = normalize_url(url).unwrap_or_else(|| url.clone());
                format!("url:{channel}:{canonical}")
            }
        }
    }
}

/// Collapse whitespace, trim, and casefold a copy field.
fn normalize_copy_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonicalize a landing URL for fingerprinting: full normalization plus
/// tracking-parameter removal, so click ids do not split creatives.
fn normalize_landing_url(url: &str) -> String {
    match normalize_url(url) {
        Some(canonical) => strip_tracking_params(&canonical),
        None => normalize_copy_text(url),
    }
}

fn hex_digest(hasher: Sha256) -> String {
    format!("{:x}", hasher.finalize())
}

/// Stable hash over the normalized copy tuple of an ad.
#[must_use]
pub fn copy_fingerprint(copy: &CreativeCopy<'_>) -> String {
    let fields = [
        copy.body_text.map(normalize_copy_text),
        copy.headline.map(normalize_copy_text),
        copy.description.map(normalize_copy_text),
        copy.cta_type.map(normalize_copy_text),
        copy.cta_text.map(normalize_copy_text),
        copy.landing_url.map(normalize_landing_url),
    ];

    let mut hasher = Sha256::new();
    for field in &fields {
        // Absent and empty must hash differently.
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update([FIELD_SEP]);
    }
    hex_digest(hasher)
}

/// Stable hash over the sorted set of linked media identities.
///
/// Duplicates collapse and order is irrelevant: the same media set always
/// produces the same fingerprint. The empty set has its own stable value.
#[must_use]
pub fn media_fingerprint(identities: &[MediaIdentity]) -> String {
    let mut keys: Vec<String> = identities.iter().map(MediaIdentity::key).collect();
    keys.sort();
    keys.dedup();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update([FIELD_SEP]);
    }
    hex_digest(hasher)
}

/// Combine copy and media fingerprints under the algorithm version tag.
#[must_use]
pub fn creative_fingerprint(copy_fp: &str, media_fp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_ALGO.as_bytes());
    hasher.update([FIELD_SEP]);
    hasher.update(copy_fp.as_bytes());
    hasher.update([FIELD_SEP]);
    hasher.update(media_fp.as_bytes());
    hex_digest(hasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_with_body(body: &str) -> CreativeCopy<'_> {
        CreativeCopy {
            body_text: Some(body),
            ..CreativeCopy::default()
        }
    }

    // -----------------------------------------------------------------------
    // copy_fingerprint
    // -----------------------------------------------------------------------

    #[test]
    fn copy_fingerprint_is_deterministic() {
        let copy = CreativeCopy {
            body_text: Some("Save 20% today"),
            headline: Some("Summer sale"),
            cta_type: Some("SHOP_NOW"),
            cta_text: Some("Shop now"),
            landing_url: Some("https://shop.example.com/x"),
            ..CreativeCopy::default()
        };
        assert_eq!(copy_fingerprint(&copy), copy_fingerprint(&copy));
    }

    #[test]
    fn copy_fingerprint_ignores_whitespace_and_case() {
        let a = copy_with_body("Save   20%  Today");
        let b = copy_with_body("save 20% today");
        assert_eq!(copy_fingerprint(&a), copy_fingerprint(&b));
    }

    #[test]
    fn copy_fingerprint_ignores_landing_url_cosmetics() {
        let a = CreativeCopy {
            landing_url: Some("https://Shop.Example.com/x?utm_source=fb"),
            ..CreativeCopy::default()
        };
        let b = CreativeCopy {
            landing_url: Some("https://shop.example.com/x"),
            ..CreativeCopy::default()
        };
        assert_eq!(copy_fingerprint(&a), copy_fingerprint(&b));
    }

    #[test]
    fn copy_fingerprint_distinguishes_different_copy() {
        let a = copy_with_body("Save 20% today");
        let b = copy_with_body("Save 30% today");
        assert_ne!(copy_fingerprint(&a), copy_fingerprint(&b));
    }

    #[test]
    fn copy_fingerprint_distinguishes_absent_from_empty() {
        let absent = CreativeCopy::default();
        let empty = copy_with_body("");
        assert_ne!(copy_fingerprint(&absent), copy_fingerprint(&empty));
    }

    #[test]
    fn copy_fingerprint_field_positions_matter() {
        let body_only = CreativeCopy {
            body_text: Some("hello"),
            ..CreativeCopy::default()
        };
        let headline_only = CreativeCopy {
            headline: Some("hello"),
            ..CreativeCopy::default()
        };
        assert_ne!(copy_fingerprint(&body_only), copy_fingerprint(&headline_only));
    }

    // -----------------------------------------------------------------------
    // media_fingerprint
    // -----------------------------------------------------------------------

    #[test]
    fn media_fingerprint_order_independent() {
        let a = vec![
            MediaIdentity::Hash("aa11".to_string()),
            MediaIdentity::Hash("bb22".to_string()),
        ];
        let b = vec![
            MediaIdentity::Hash("bb22".to_string()),
            MediaIdentity::Hash("aa11".to_string()),
        ];
        assert_eq!(media_fingerprint(&a), media_fingerprint(&b));
    }

    #[test]
    fn media_fingerprint_collapses_duplicates() {
        let once = vec![MediaIdentity::Hash("aa11".to_string())];
        let twice = vec![
            MediaIdentity::Hash("aa11".to_string()),
            MediaIdentity::Hash("AA11".to_string()),
        ];
        assert_eq!(media_fingerprint(&once), media_fingerprint(&twice));
    }

    #[test]
    fn media_fingerprint_empty_set_is_stable() {
        assert_eq!(media_fingerprint(&[]), media_fingerprint(&[]));
        assert_ne!(
            media_fingerprint(&[]),
            media_fingerprint(&[MediaIdentity::Hash("aa".to_string())])
        );
    }

    #[test]
    fn media_fingerprint_url_identity_uses_canonical_form() {
        let a = vec![MediaIdentity::SourceUrl {
            channel: "meta".to_string(),
            url: "https://CDN.Example.com/a.jpg".to_string(),
        }];
        let b = vec![MediaIdentity::SourceUrl {
            channel: "meta".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
        }];
        assert_eq!(media_fingerprint(&a), media_fingerprint(&b));
    }

    #[test]
    fn media_fingerprint_channel_scopes_url_identity() {
        let meta = vec![MediaIdentity::SourceUrl {
            channel: "meta".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
        }];
        let tiktok = vec![MediaIdentity::SourceUrl {
            channel: "tiktok".to_string(),
            url: "https://cdn.example.com/a.jpg".to_string(),
        }];
        assert_ne!(media_fingerprint(&meta), media_fingerprint(&tiktok));
    }

    // -----------------------------------------------------------------------
    // creative_fingerprint
    // -----------------------------------------------------------------------

    #[test]
    fn creative_fingerprint_changes_with_either_component() {
        let base = creative_fingerprint("copy-a", "media-a");
        assert_ne!(base, creative_fingerprint("copy-b", "media-a"));
        assert_ne!(base, creative_fingerprint("copy-a", "media-b"));
    }

    #[test]
    fn creative_fingerprint_matches_known_scenario() {
        // Two ads with identical copy and the same image hash must produce
        // the same creative fingerprint even when their landing URLs differ
        // only in case.
        let copy_a = CreativeCopy {
            body_text: Some("Save 20% today"),
            landing_url: Some("https://Shop.Example.com/x"),
            ..CreativeCopy::default()
        };
        let copy_b = CreativeCopy {
            body_text: Some("Save 20% today"),
            landing_url: Some("https://shop.example.com/x"),
            ..CreativeCopy::default()
        };
        let media = vec![MediaIdentity::Hash("h1".to_string())];

        let fp_a = creative_fingerprint(&copy_fingerprint(&copy_a), &media_fingerprint(&media));
        let fp_b = creative_fingerprint(&copy_fingerprint(&copy_b), &media_fingerprint(&media));
        assert_eq!(fp_a, fp_b);
    }
}
