//! Offline unit tests for adscope-db pool configuration and row types.
//! These tests do not require a live database connection.

use adscope_core::{AppConfig, Environment};
use adscope_db::{AdIngestRunRow, AdLibraryPageTotalRow, AdRow, MediaAssetRow, PoolConfig};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        brands_path: PathBuf::from("./config/brands.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        ingest_max_concurrent_identities: 2,
        backfill_batch_size: 500,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`AdRow`] has all expected fields
/// with the correct types. No database required.
#[test]
fn ad_row_has_expected_fields() {
    use chrono::Utc;

    let row = AdRow {
        id: 1_i64,
        brand_id: 7_i64,
        brand_channel_identity_id: Some(3_i64),
        channel: "meta".to_string(),
        external_ad_id: "ext-1".to_string(),
        ad_status: Some("active".to_string()),
        started_running_at: None,
        ended_running_at: None,
        first_seen_at: Utc::now(),
        last_seen_at: Utc::now(),
        body_text: Some("Save 20% today".to_string()),
        headline: None,
        description: None,
        cta_type: Some("SHOP_NOW".to_string()),
        cta_text: Some("Shop now".to_string()),
        landing_url: Some("https://shop.example.com/x".to_string()),
        destination_domain: Some("example.com".to_string()),
        display_format: None,
        country_codes: Some(vec!["US".to_string()]),
        language_codes: None,
        raw_json: serde_json::json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.channel, "meta");
    assert_eq!(row.external_ad_id, "ext-1");
    assert_eq!(row.destination_domain.as_deref(), Some("example.com"));
    assert!(row.headline.is_none());
}

/// Compile-time smoke test for [`MediaAssetRow`].
#[test]
fn media_asset_row_has_expected_fields() {
    use chrono::Utc;

    let row = MediaAssetRow {
        id: 5_i64,
        channel: "meta".to_string(),
        asset_kind: "image".to_string(),
        sha256: Some("h1".to_string()),
        source_url: Some("https://cdn.example.com/a.jpg".to_string()),
        stored_url: None,
        mime_type: Some("image/jpeg".to_string()),
        size_bytes: None,
        width: Some(1080),
        height: Some(1080),
        duration_seconds: None,
        mirror_status: "pending".to_string(),
        metadata: serde_json::json!({}),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.mirror_status, "pending");
    assert_eq!(row.sha256.as_deref(), Some("h1"));
    assert!(row.stored_url.is_none());
}

/// Compile-time smoke test for [`AdIngestRunRow`].
#[test]
fn ad_ingest_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = AdIngestRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        research_run_id: None,
        brand_channel_identity_id: Some(9_i64),
        provider: "meta_ad_library".to_string(),
        provider_run_id: None,
        provider_dataset_id: None,
        status: "queued".to_string(),
        is_partial: false,
        empty_reason: None,
        items_total: 0_i32,
        items_succeeded: 0_i32,
        items_failed: 0_i32,
        error_message: None,
        started_at: None,
        completed_at: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.status, "queued");
    assert_eq!(row.provider, "meta_ad_library");
    assert!(row.empty_reason.is_none());
    assert_eq!(row.items_total, 0);
}

/// Compile-time smoke test for [`AdLibraryPageTotalRow`].
#[test]
fn ad_library_page_total_row_has_expected_fields() {
    use chrono::Utc;

    let row = AdLibraryPageTotalRow {
        id: 3_i64,
        research_run_id: 1_i64,
        brand_channel_identity_id: 9_i64,
        query_key: "page:all_ads:US".to_string(),
        total_count: 128_i32,
        raw_payload: serde_json::json!({"source": "cli"}),
        captured_at: Utc::now(),
        updated_at: Utc::now(),
    };

    assert_eq!(row.query_key, "page:all_ads:US");
    assert_eq!(row.total_count, 128);
}
