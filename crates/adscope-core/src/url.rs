//! URL canonicalization and registrable-domain extraction.
//!
//! These functions are used as identity inputs (brand dedup keys, creative
//! fingerprints), not for display. They are total: malformed input yields
//! `None` rather than an error.

use percent_encoding::percent_decode_str;

/// Multi-part public suffixes seen in ad-library landing URLs. Registrable
/// domains under these keep three labels (`shop.example.co.uk` → `example.co.uk`).
const MULTI_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "co.jp", "co.nz", "co.in", "co.za", "co.kr", "com.au",
    "net.au", "org.au", "com.br", "com.mx", "com.sg", "com.tr",
];

/// Query parameters that carry click/campaign tracking rather than landing
/// page identity. `utm_`-prefixed keys are stripped as a family.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "ttclid", "msclkid", "mc_eid", "igshid", "twclid", "li_fat_id",
];

/// Canonicalize a URL for identity comparison.
///
/// Lower-cases the scheme and host, strips default ports (80 for http, 443
/// for https), drops any fragment, and leaves the path and query untouched.
/// A missing scheme is assumed to be `https`. Returns `None` for empty
/// input, non-http(s) schemes, and URLs without a parseable host.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (scheme, rest) = match trimmed.split_once("://") {
        Some((s, r)) => (s.to_ascii_lowercase(), r),
        None => {
            // A scheme-looking prefix without "//" ("mailto:x@y", "tel:+1..")
            // is not a web URL. A dotted prefix is a bare host with a port.
            if let Some((prefix, _)) = trimmed.split_once(':') {
                if !prefix.contains('.') {
                    return None;
                }
            }
            ("https".to_string(), trimmed)
        }
    };
    if scheme != "http" && scheme != "https" {
        return None;
    }

    // Authority ends at the first path/query/fragment delimiter.
    let split_at = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(split_at);

    // Discard userinfo; it is never part of landing-page identity.
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let (host_raw, port) = match host_port.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
            (h, Some(p.to_string()))
        }
        _ => (host_port, None),
    };

    let host = percent_decode_str(host_raw)
        .decode_utf8()
        .ok()?
        .to_lowercase();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return None;
    }

    let default_port = if scheme == "http" { "80" } else { "443" };
    let port_suffix = match port {
        Some(p) if p != default_port => format!(":{p}"),
        _ => String::new(),
    };

    // Drop the fragment; keep path and query byte-for-byte.
    let tail = tail.split_once('#').map_or(tail, |(before, _)| before);

    Some(format!("{scheme}://{host}{port_suffix}{tail}"))
}

/// Extract the registrable domain from a URL.
///
/// Canonicalizes via [`normalize_url`] first, strips a leading `www.`, and
/// reduces the host to its registrable suffix (two labels, or three when the
/// last two form a known multi-part public suffix). Returns `None` for
/// unparseable input, IP-literal hosts, and single-label hosts such as
/// `localhost`.
#[must_use]
pub fn derive_primary_domain(raw: &str) -> Option<String> {
    let normalized = normalize_url(raw)?;
    let after_scheme = normalized.split_once("://")?.1;
    let host_port = after_scheme.split(['/', '?']).next()?;
    let host = host_port.split(':').next()?;

    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }

    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let take = if MULTI_PART_SUFFIXES.contains(&last_two.as_str()) && labels.len() >= 3 {
        3
    } else {
        2
    };
    Some(labels[labels.len() - take..].join("."))
}

/// Remove known tracking query parameters from an already-normalized URL.
///
/// Used when building creative fingerprints so that two sightings of the
/// same landing page with different click ids do not fragment into separate
/// creatives. Unknown parameters are preserved in their original order.
#[must_use]
pub fn strip_tracking_params(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            let key = key.to_ascii_lowercase();
            !(key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str()))
        })
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // normalize_url
    // -----------------------------------------------------------------------

    #[test]
    fn normalize_url_lowercases_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTPS://Shop.Example.COM/Path?Q=1").as_deref(),
            Some("https://shop.example.com/Path?Q=1")
        );
    }

    #[test]
    fn normalize_url_preserves_path_case_and_query() {
        assert_eq!(
            normalize_url("https://example.com/A/B?x=Y&z=1").as_deref(),
            Some("https://example.com/A/B?x=Y&z=1")
        );
    }

    #[test]
    fn normalize_url_strips_default_https_port() {
        assert_eq!(
            normalize_url("https://example.com:443/x").as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn normalize_url_strips_default_http_port() {
        assert_eq!(
            normalize_url("http://example.com:80/").as_deref(),
            Some("http://example.com/")
        );
    }

    #[test]
    fn normalize_url_keeps_nonstandard_port() {
        assert_eq!(
            normalize_url("https://example.com:8443/x").as_deref(),
            Some("https://example.com:8443/x")
        );
    }

    #[test]
    fn normalize_url_assumes_https_when_scheme_missing() {
        assert_eq!(
            normalize_url("example.com/landing").as_deref(),
            Some("https://example.com/landing")
        );
    }

    #[test]
    fn normalize_url_drops_fragment() {
        assert_eq!(
            normalize_url("https://example.com/x#section").as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn normalize_url_drops_userinfo() {
        assert_eq!(
            normalize_url("https://user:pw@example.com/x").as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn normalize_url_rejects_empty_input() {
        assert!(normalize_url("").is_none());
        assert!(normalize_url("   ").is_none());
    }

    #[test]
    fn normalize_url_rejects_non_http_schemes() {
        assert!(normalize_url("ftp://example.com/file").is_none());
        assert!(normalize_url("mailto:ads@example.com").is_none());
    }

    #[test]
    fn normalize_url_rejects_missing_host() {
        assert!(normalize_url("https:///path-only").is_none());
    }

    #[test]
    fn normalize_url_is_idempotent() {
        let once = normalize_url("HTTPS://Shop.Example.com:443/x?a=1").unwrap();
        let twice = normalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    // -----------------------------------------------------------------------
    // derive_primary_domain
    // -----------------------------------------------------------------------

    #[test]
    fn derive_primary_domain_basic() {
        assert_eq!(
            derive_primary_domain("https://shop.example.com/x").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn derive_primary_domain_strips_www() {
        assert_eq!(
            derive_primary_domain("https://www.example.com").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn derive_primary_domain_handles_multi_part_suffix() {
        assert_eq!(
            derive_primary_domain("https://shop.brand.co.uk/sale").as_deref(),
            Some("brand.co.uk")
        );
    }

    #[test]
    fn derive_primary_domain_bare_multi_part_suffix_host() {
        // "brand.co.uk" with no extra label still registers as itself.
        assert_eq!(
            derive_primary_domain("https://brand.co.uk").as_deref(),
            Some("brand.co.uk")
        );
    }

    #[test]
    fn derive_primary_domain_rejects_ip_hosts() {
        assert!(derive_primary_domain("http://192.168.0.1/admin").is_none());
    }

    #[test]
    fn derive_primary_domain_rejects_single_label_host() {
        assert!(derive_primary_domain("http://localhost:3000/x").is_none());
    }

    #[test]
    fn derive_primary_domain_rejects_garbage() {
        assert!(derive_primary_domain("not a url at all").is_none());
        assert!(derive_primary_domain("").is_none());
    }

    // -----------------------------------------------------------------------
    // strip_tracking_params
    // -----------------------------------------------------------------------

    #[test]
    fn strip_tracking_params_removes_utm_family() {
        assert_eq!(
            strip_tracking_params("https://example.com/x?utm_source=fb&utm_medium=cpc&size=large"),
            "https://example.com/x?size=large"
        );
    }

    #[test]
    fn strip_tracking_params_removes_click_ids() {
        assert_eq!(
            strip_tracking_params("https://example.com/x?fbclid=abc123&color=red"),
            "https://example.com/x?color=red"
        );
    }

    #[test]
    fn strip_tracking_params_drops_question_mark_when_query_emptied() {
        assert_eq!(
            strip_tracking_params("https://example.com/x?gclid=zzz"),
            "https://example.com/x"
        );
    }

    #[test]
    fn strip_tracking_params_no_query_is_identity() {
        assert_eq!(
            strip_tracking_params("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn strip_tracking_params_preserves_unknown_param_order() {
        assert_eq!(
            strip_tracking_params("https://example.com/x?b=2&utm_term=t&a=1"),
            "https://example.com/x?b=2&a=1"
        );
    }
}
