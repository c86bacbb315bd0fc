//! Brand and channel-identity resolution.
//!
//! Runs once per brand before ad ingestion begins. All dedup happens in the
//! database through conflict-aware upserts; this module's job is computing
//! the normalized inputs (name, domain) and walking the catalog.

use sqlx::PgPool;
use uuid::Uuid;

use adscope_core::{
    derive_primary_domain, normalize_brand_name, normalize_url, BrandCatalog, BrandConfig,
};
use adscope_db::{
    BrandChannelIdentityRow, BrandRow, NewBrand, NewBrandChannelIdentity, VERIFICATION_UNVERIFIED,
    VERIFICATION_VERIFIED,
};

use crate::error::IngestError;

/// A brand resolved to its database row together with its channel identities.
#[derive(Debug, Clone)]
pub struct ResolvedBrand {
    pub brand: BrandRow,
    pub identities: Vec<BrandChannelIdentityRow>,
}

/// Result of a full catalog sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogSyncSummary {
    pub brands: usize,
    pub identities: usize,
    pub new_relationships: usize,
}

/// Resolve one configured brand to its canonical row, creating or filling
/// in the brand and each of its channel identities.
///
/// Dedup keys: `(org_id, primary_domain)` when a domain can be derived from
/// the configured website, else `(org_id, normalized_name)` among
/// domainless rows. Concurrent calls with the same domain converge on one
/// row via the unique constraint, not application locking.
///
/// # Errors
///
/// Returns [`IngestError::Identity`] for unusable input (blank name), or a
/// wrapped [`adscope_db::DbError`] if a store write fails.
pub async fn resolve_brand(
    pool: &PgPool,
    org_id: Uuid,
    config: &BrandConfig,
) -> Result<ResolvedBrand, IngestError> {
    let canonical_name = config.name.trim();
    if canonical_name.is_empty() {
        return Err(IngestError::Identity {
            name: config.name.clone(),
            reason: "brand name is blank".to_string(),
        });
    }

    let normalized_name = normalize_brand_name(canonical_name);
    let website = config.website.as_deref().and_then(normalize_url);
    let primary_domain = config.website.as_deref().and_then(derive_primary_domain);

    let brand = adscope_db::upsert_brand(
        pool,
        &NewBrand {
            org_id,
            canonical_name,
            normalized_name: &normalized_name,
            primary_website_url: website.as_deref(),
            primary_domain: primary_domain.as_deref(),
        },
    )
    .await?;

    let mut identities = Vec::with_capacity(config.identities.len());
    for identity in &config.identities {
        let verification_status = if identity.verified {
            VERIFICATION_VERIFIED
        } else {
            VERIFICATION_UNVERIFIED
        };
        let row = adscope_db::upsert_brand_channel_identity(
            pool,
            &NewBrandChannelIdentity {
                brand_id: brand.id,
                channel: &identity.channel,
                external_id: identity.external_id.as_deref(),
                external_url: identity.external_url.as_deref(),
                display_name: identity.display_name.as_deref(),
                verification_status,
                metadata: serde_json::json!({}),
            },
        )
        .await?;
        identities.push(row);
    }

    tracing::debug!(
        brand = %brand.canonical_name,
        brand_id = brand.id,
        identities = identities.len(),
        "brand resolved"
    );

    Ok(ResolvedBrand { brand, identities })
}

/// Sync the whole brand catalog: the product anchor, every brand, its
/// identities, and the typed product↔brand edges.
///
/// Per-brand failures are logged and skipped so one bad catalog entry does
/// not abort the sync; the summary reflects only what succeeded.
///
/// # Errors
///
/// Returns a wrapped [`adscope_db::DbError`] if the product anchor itself
/// cannot be upserted.
pub async fn sync_brand_catalog(
    pool: &PgPool,
    catalog: &BrandCatalog,
) -> Result<CatalogSyncSummary, IngestError> {
    let product = adscope_db::upsert_product(pool, catalog.org_id, &catalog.product).await?;

    let mut summary = CatalogSyncSummary::default();
    for config in &catalog.brands {
        let resolved = match resolve_brand(pool, catalog.org_id, config).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!(brand = %config.name, error = %e, "skipping brand — resolution failed");
                continue;
            }
        };

        match adscope_db::ensure_product_brand_relationship(
            pool,
            product.id,
            resolved.brand.id,
            &config.relationship,
            "catalog_sync",
        )
        .await
        {
            Ok(inserted) => {
                if inserted {
                    summary.new_relationships += 1;
                }
            }
            Err(e) => {
                tracing::warn!(brand = %config.name, error = %e, "failed to record product relationship");
            }
        }

        summary.brands += 1;
        summary.identities += resolved.identities.len();
    }

    Ok(summary)
}
