//! Brand catalog configuration: the seed file that names the advertisers an
//! org is researching and their known ad-channel identities.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    /// Brand homepage; the primary domain is derived from it.
    pub website: Option<String>,
    /// Typed edge to the org's product, e.g. `"competitor"`.
    #[serde(default = "default_relationship")]
    pub relationship: String,
    #[serde(default)]
    pub identities: Vec<ChannelIdentityConfig>,
}

fn default_relationship() -> String {
    "competitor".to_string()
}

/// One known presence of a brand on an ad channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelIdentityConfig {
    pub channel: String,
    /// Provider page/profile id; preferred identity key when present.
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// Normalize a brand name for dedup: casefold, trim, collapse inner
/// whitespace. This is the value stored in `brands.normalized_name`.
#[must_use]
pub fn normalize_brand_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Deserialize)]
pub struct BrandCatalog {
    pub org_id: Uuid,
    /// Product the cataloged brands relate to.
    pub product: String,
    pub brands: Vec<BrandConfig>,
}

/// Load and validate the brand catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brand_catalog(path: &Path) -> Result<BrandCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: BrandCatalog = serde_yaml::from_str(&content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &BrandCatalog) -> Result<(), ConfigError> {
    if catalog.product.trim().is_empty() {
        return Err(ConfigError::Validation(
            "product name must be non-empty".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    for brand in &catalog.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(normalize_brand_name(&brand.name)) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }

        for identity in &brand.identities {
            if identity.channel.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' has an identity with an empty channel",
                    brand.name
                )));
            }
            if identity.external_id.is_none() && identity.external_url.is_none() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' identity on '{}' needs an external_id or external_url",
                    brand.name, identity.channel
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<BrandCatalog, ConfigError> {
        let catalog: BrandCatalog = serde_yaml::from_str(yaml)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    const VALID: &str = r#"
org_id: 7f8ff2a0-33aa-46fa-9a4e-d8a6a7a1f8b3
product: Sparkling Water
brands:
  - name: Fizzi
    website: https://drinkfizzi.com
    identities:
      - channel: meta
        external_id: "1234567890"
        display_name: Fizzi
        verified: true
  - name: Bubbly Rival
    relationship: competitor
    identities:
      - channel: meta
        external_url: https://facebook.com/bubblyrival
"#;

    #[test]
    fn parses_valid_catalog() {
        let catalog = parse(VALID).expect("catalog should parse");
        assert_eq!(catalog.brands.len(), 2);
        assert_eq!(catalog.brands[0].identities[0].channel, "meta");
        assert!(catalog.brands[0].identities[0].verified);
        assert_eq!(catalog.brands[1].relationship, "competitor");
    }

    #[test]
    fn rejects_duplicate_brand_names_case_insensitively() {
        let yaml = r#"
org_id: 7f8ff2a0-33aa-46fa-9a4e-d8a6a7a1f8b3
product: Sparkling Water
brands:
  - name: Fizzi
  - name: "  FIZZI "
"#;
        let err = parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn rejects_identity_without_any_key() {
        let yaml = r#"
org_id: 7f8ff2a0-33aa-46fa-9a4e-d8a6a7a1f8b3
product: Sparkling Water
brands:
  - name: Fizzi
    identities:
      - channel: meta
"#;
        let err = parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("external_id")));
    }

    #[test]
    fn rejects_empty_product() {
        let yaml = r#"
org_id: 7f8ff2a0-33aa-46fa-9a4e-d8a6a7a1f8b3
product: "  "
brands: []
"#;
        let err = parse(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("product")));
    }

    #[test]
    fn normalize_brand_name_collapses_and_casefolds() {
        assert_eq!(normalize_brand_name("  Fizzi   Water  Co "), "fizzi water co");
    }
}
