//! Brand catalog command handlers.

use clap::Subcommand;
use std::path::PathBuf;

/// Sub-commands available under `brands`.
#[derive(Debug, Subcommand)]
pub enum BrandsCommands {
    /// Upsert brands, channel identities, and product relationships from the
    /// catalog file
    Sync {
        /// Catalog path; defaults to ADSCOPE_BRANDS_PATH
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// Dispatch a `brands` sub-command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the product anchor
/// cannot be written. Per-brand failures are logged and skipped inside the
/// sync, not propagated.
pub async fn run(
    pool: &sqlx::PgPool,
    config: &adscope_core::AppConfig,
    command: BrandsCommands,
) -> anyhow::Result<()> {
    match command {
        BrandsCommands::Sync { file } => {
            let path = file.unwrap_or_else(|| config.brands_path.clone());
            let catalog = adscope_core::load_brand_catalog(&path)?;
            let summary = adscope_ingest::sync_brand_catalog(pool, &catalog).await?;
            println!(
                "synced {} brands ({} identities, {} new product relationships)",
                summary.brands, summary.identities, summary.new_relationships
            );
            Ok(())
        }
    }
}
