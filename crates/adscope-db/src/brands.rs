//! Database operations for the `brands` table.
//!
//! Brand rows are created on first sighting and only ever gain data after
//! that: null fields fill in, populated fields are never overwritten, and
//! nothing in the ingestion pipeline deletes a brand.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub public_id: Uuid,
    pub org_id: Uuid,
    pub canonical_name: String,
    pub normalized_name: String,
    pub primary_website_url: Option<String>,
    pub primary_domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`upsert_brand`]. `normalized_name` and `primary_domain` are
/// computed by the identity resolver before the row ever reaches SQL.
#[derive(Debug, Clone, Copy)]
pub struct NewBrand<'a> {
    pub org_id: Uuid,
    pub canonical_name: &'a str,
    pub normalized_name: &'a str,
    pub primary_website_url: Option<&'a str>,
    pub primary_domain: Option<&'a str>,
}

const BRAND_COLUMNS: &str = "id, public_id, org_id, canonical_name, normalized_name, \
     primary_website_url, primary_domain, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Find-or-create a brand by its org-scoped identity.
///
/// When a primary domain is known the row is keyed on `(org_id,
/// primary_domain)`; domainless brands are keyed on `(org_id,
/// normalized_name)` among rows with no domain. Either path is a single
/// `INSERT .. ON CONFLICT .. DO UPDATE .. RETURNING`, so two workers racing
/// on the same key converge on one row without locks. On a hit, only
/// currently-null fields are filled; existing values always win.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_brand(pool: &PgPool, brand: &NewBrand<'_>) -> Result<BrandRow, DbError> {
    let row = if brand.primary_domain.is_some() {
        sqlx::query_as::<_, BrandRow>(&format!(
            "INSERT INTO brands \
                 (org_id, canonical_name, normalized_name, primary_website_url, primary_domain) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (org_id, primary_domain) WHERE primary_domain IS NOT NULL DO UPDATE SET \
                 primary_website_url = COALESCE(brands.primary_website_url, EXCLUDED.primary_website_url), \
                 updated_at          = NOW() \
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(brand.org_id)
        .bind(brand.canonical_name)
        .bind(brand.normalized_name)
        .bind(brand.primary_website_url)
        .bind(brand.primary_domain)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as::<_, BrandRow>(&format!(
            "INSERT INTO brands \
                 (org_id, canonical_name, normalized_name, primary_website_url, primary_domain) \
             VALUES ($1, $2, $3, $4, NULL) \
             ON CONFLICT (org_id, normalized_name) WHERE primary_domain IS NULL DO UPDATE SET \
                 primary_website_url = COALESCE(brands.primary_website_url, EXCLUDED.primary_website_url), \
                 updated_at          = NOW() \
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(brand.org_id)
        .bind(brand.canonical_name)
        .bind(brand.normalized_name)
        .bind(brand.primary_website_url)
        .fetch_one(pool)
        .await?
    };

    Ok(row)
}

/// Returns a brand by its internal `id`, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand(pool: &PgPool, id: i64) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} \
         FROM brands \
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a brand by `(org_id, normalized_name)` regardless of whether it
/// carries a domain, or `None` if not found. Used by the CLI to resolve a
/// `--brand` argument; ambiguity is impossible because the lookup prefers
/// the domainless row only when no domained row matches.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_by_normalized_name(
    pool: &PgPool,
    org_id: Uuid,
    normalized_name: &str,
) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} \
         FROM brands \
         WHERE org_id = $1 AND normalized_name = $2 \
         ORDER BY (primary_domain IS NULL), id \
         LIMIT 1"
    ))
    .bind(org_id)
    .bind(normalized_name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
