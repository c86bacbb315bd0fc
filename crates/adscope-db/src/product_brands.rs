//! Database operations for `products` and the typed `product_brands` edges.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `products` table. Minimal on purpose: the product is an
/// anchor for research scoping and brand relationships, not a catalog entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub public_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Find-or-create a product by `(org_id, name)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(pool: &PgPool, org_id: Uuid, name: &str) -> Result<ProductRow, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products (org_id, name) \
         VALUES ($1, $2) \
         ON CONFLICT (org_id, name) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id, public_id, org_id, name, created_at",
    )
    .bind(org_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Idempotently record a typed edge between a product and a brand.
///
/// A second call with the same `(product_id, brand_id, relationship_type)`
/// is a no-op. Returns `true` if a new edge was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn ensure_product_brand_relationship(
    pool: &PgPool,
    product_id: i64,
    brand_id: i64,
    relationship_type: &str,
    discovered_via: &str,
) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "INSERT INTO product_brands (product_id, brand_id, relationship_type, discovered_via) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (product_id, brand_id, relationship_type) DO NOTHING",
    )
    .bind(product_id)
    .bind(brand_id)
    .bind(relationship_type)
    .bind(discovered_via)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}
