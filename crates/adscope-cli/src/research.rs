//! Research run command handlers: the unit-of-work scoping a set of brands
//! under investigation for one product.

use clap::Subcommand;

use adscope_core::normalize_brand_name;

/// Sub-commands available under `research`.
#[derive(Debug, Subcommand)]
pub enum ResearchCommands {
    /// Start a research run scoped to the catalog's org, product, and brands
    Start {
        #[arg(long, default_value = "competitor_ads")]
        purpose: String,
    },
    /// Mark a research run completed
    Complete {
        #[arg(long)]
        id: i64,
    },
    /// Record a provider-reported page total for one brand identity.
    /// Re-recording the same query key overwrites the previous snapshot.
    RecordTotal {
        #[arg(long)]
        id: i64,

        /// Brand name as it appears in the catalog
        #[arg(long)]
        brand: String,

        #[arg(long)]
        channel: String,

        /// Provider query descriptor (e.g. "page:all_ads:US")
        #[arg(long)]
        query_key: String,

        #[arg(long)]
        total: i32,
    },
}

/// Dispatch a `research` sub-command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or a store write fails.
pub async fn run(
    pool: &sqlx::PgPool,
    config: &adscope_core::AppConfig,
    command: ResearchCommands,
) -> anyhow::Result<()> {
    match command {
        ResearchCommands::Start { purpose } => {
            let catalog = adscope_core::load_brand_catalog(&config.brands_path)?;
            let product = adscope_db::upsert_product(pool, catalog.org_id, &catalog.product).await?;
            let run =
                adscope_db::create_research_run(pool, catalog.org_id, Some(product.id), &purpose)
                    .await?;

            let mut scoped = 0usize;
            for brand_config in &catalog.brands {
                let normalized = normalize_brand_name(&brand_config.name);
                let Some(brand) =
                    adscope_db::get_brand_by_normalized_name(pool, catalog.org_id, &normalized)
                        .await?
                else {
                    tracing::warn!(
                        brand = %brand_config.name,
                        "brand not in database; run `brands sync` before starting research"
                    );
                    continue;
                };
                adscope_db::upsert_research_run_brand(pool, run.id, brand.id, "pending").await?;
                scoped += 1;
            }

            println!("research run {} started ({scoped} brands in scope)", run.id);
            Ok(())
        }
        ResearchCommands::Complete { id } => {
            adscope_db::complete_research_run(pool, id).await?;
            println!("research run {id} completed");
            Ok(())
        }
        ResearchCommands::RecordTotal {
            id,
            brand,
            channel,
            query_key,
            total,
        } => {
            let catalog = adscope_core::load_brand_catalog(&config.brands_path)?;
            let normalized = normalize_brand_name(&brand);
            let brand_row =
                adscope_db::get_brand_by_normalized_name(pool, catalog.org_id, &normalized)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("brand '{brand}' not found"))?;
            let identity = adscope_db::get_brand_channel_identity(pool, brand_row.id, &channel)
                .await?
                .ok_or_else(|| {
                    anyhow::anyhow!("brand '{brand}' has no identity on channel '{channel}'")
                })?;

            let row = adscope_db::upsert_ad_library_page_total(
                pool,
                id,
                identity.id,
                &query_key,
                total,
                &serde_json::json!({"source": "cli"}),
            )
            .await?;
            println!(
                "recorded page total {} for {} on {} (captured {})",
                row.total_count,
                brand,
                channel,
                row.captured_at.format("%Y-%m-%d %H:%M:%S")
            );
            Ok(())
        }
    }
}
