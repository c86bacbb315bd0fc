//! Ingest command handler: feed adapter-produced NDJSON files through the
//! ingestion pipeline, one ingest run per file.
//!
//! Per-file failures are logged and skipped rather than propagated so a
//! single bad file does not abort the batch; per-ad failures are handled
//! inside the runner the same way.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use uuid::Uuid;

use adscope_core::{normalize_brand_name, NormalizedAd};
use adscope_ingest::IngestScope;

pub struct IngestArgs {
    pub channel: String,
    pub brand: String,
    pub org: Option<Uuid>,
    pub input: Vec<PathBuf>,
    pub provider: String,
    pub research_run: Option<i64>,
    pub dry_run: bool,
}

/// Run ingestion for one brand identity across one or more NDJSON files.
///
/// # Errors
///
/// Returns an error if the org cannot be determined, the brand is unknown,
/// or no input file could be read at all. Per-file and per-ad failures are
/// logged and reflected in run rows, not propagated.
pub async fn run_ingest(
    pool: &sqlx::PgPool,
    config: &adscope_core::AppConfig,
    args: &IngestArgs,
) -> anyhow::Result<()> {
    let org_id = match args.org {
        Some(org_id) => org_id,
        None => adscope_core::load_brand_catalog(&config.brands_path)?.org_id,
    };

    let normalized_name = normalize_brand_name(&args.brand);
    let brand = adscope_db::get_brand_by_normalized_name(pool, org_id, &normalized_name)
        .await?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "brand '{}' not found for org {org_id}; run `adscope-cli brands sync` first",
                args.brand
            )
        })?;

    let identity =
        adscope_db::get_brand_channel_identity(pool, brand.id, &args.channel).await?;
    if identity.is_none() {
        tracing::warn!(
            brand = %brand.canonical_name,
            channel = %args.channel,
            "no channel identity recorded; runs will not be attributable to a page"
        );
    }
    let identity_id = identity.as_ref().map(|i| i.id);

    if args.dry_run {
        for path in &args.input {
            match read_normalized_ads(path) {
                Ok(ads) => println!("dry-run: {} ads in {}", ads.len(), path.display()),
                Err(e) => println!("dry-run: {} is unreadable: {e:#}", path.display()),
            }
        }
        return Ok(());
    }

    let max_concurrent = config.ingest_max_concurrent_identities.max(1);
    let results: Vec<(&PathBuf, anyhow::Result<adscope_ingest::IngestSummary>)> =
        stream::iter(&args.input)
            .map(|path| {
                let scope = IngestScope {
                    org_id,
                    brand_id: brand.id,
                    brand_channel_identity_id: identity_id,
                    channel: args.channel.clone(),
                    provider: args.provider.clone(),
                    research_run_id: args.research_run,
                    provider_run_id: None,
                    provider_dataset_id: None,
                    provider_hit_result_limit: false,
                };
                async move { (path, ingest_file(pool, scope, path).await) }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

    let mut files_failed = 0usize;
    let mut total_succeeded = 0usize;
    let mut total_failed = 0usize;
    for (path, result) in &results {
        match result {
            Ok(summary) => {
                total_succeeded += summary.items_succeeded;
                total_failed += summary.items_failed;
                println!(
                    "{}: run {} — {}/{} ads upserted ({} failed)",
                    path.display(),
                    summary.run_id,
                    summary.items_succeeded,
                    summary.items_total,
                    summary.items_failed
                );
            }
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "file ingest failed");
                files_failed += 1;
            }
        }
    }

    if files_failed == results.len() {
        anyhow::bail!("all {files_failed} input files failed to ingest");
    }

    println!(
        "ingested {} ads across {} files ({} ad failures, {} file failures)",
        total_succeeded,
        results.len(),
        total_failed,
        files_failed
    );
    Ok(())
}

async fn ingest_file(
    pool: &sqlx::PgPool,
    scope: IngestScope,
    path: &Path,
) -> anyhow::Result<adscope_ingest::IngestSummary> {
    let ads = read_normalized_ads(path)?;
    let summary = adscope_ingest::ingest_ads(pool, &scope, &ads).await?;
    Ok(summary)
}

/// Read one NDJSON file of [`NormalizedAd`] records. Unparseable lines are
/// logged and skipped; blank lines are ignored.
fn read_normalized_ads(path: &Path) -> anyhow::Result<Vec<NormalizedAd>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;

    let mut ads = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<NormalizedAd>(line) {
            Ok(ad) => ads.push(ad),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "skipping unparseable record"
                );
            }
        }
    }
    Ok(ads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_normalized_ads_skips_bad_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join("adscope_cli_ingest_test.ndjson");
        std::fs::write(
            &path,
            concat!(
                r#"{"external_ad_id":"ext-1","ad_status":"active","started_running_at":null,"#,
                r#""ended_running_at":null,"first_seen_at":null,"last_seen_at":null,"#,
                r#""body_text":"Save 20% today","headline":null,"description":null,"#,
                r#""cta_type":null,"cta_text":null,"landing_url":null,"display_format":null}"#,
                "\n",
                "not json\n",
                "\n",
            ),
        )
        .unwrap();

        let ads = read_normalized_ads(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].external_ad_id, "ext-1");
    }

    #[test]
    fn read_normalized_ads_missing_file_errors() {
        let err = read_normalized_ads(Path::new("/nonexistent/ads.ndjson")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
