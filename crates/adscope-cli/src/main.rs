use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod backfill;
mod brands;
mod ingest;
mod research;
mod runs;

#[derive(Debug, Parser)]
#[command(name = "adscope-cli")]
#[command(about = "adscope ad-library ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations
    Migrate,
    /// Brand catalog management
    Brands {
        #[command(subcommand)]
        command: brands::BrandsCommands,
    },
    /// Ingest adapter-produced normalized ads from NDJSON files
    Ingest {
        /// Ad channel the records were scraped from (e.g. meta)
        #[arg(long)]
        channel: String,

        /// Brand name as it appears in the catalog
        #[arg(long)]
        brand: String,

        /// Org scope; defaults to the org_id in the brand catalog file
        #[arg(long)]
        org: Option<Uuid>,

        /// One NDJSON file per provider call, each ingested as its own run
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Provider name recorded on the ingest run
        #[arg(long, default_value = "ad_library_scraper")]
        provider: String,

        /// Attach the ingest runs to an existing research run
        #[arg(long)]
        research_run: Option<i64>,

        /// Parse and count records without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Research run management
    Research {
        #[command(subcommand)]
        command: research::ResearchCommands,
    },
    /// Backfill derived rows for ads that are missing them
    Backfill {
        #[command(subcommand)]
        command: backfill::BackfillCommands,
    },
    /// Inspect ingest run history
    Runs {
        #[command(subcommand)]
        command: runs::RunsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = adscope_core::load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let pool_config = adscope_db::PoolConfig::from_app_config(&config);
    let pool = adscope_db::connect_pool(&config.database_url, pool_config).await?;
    match cli.command {
        Commands::Migrate => {
            let applied = adscope_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
        Commands::Brands { command } => brands::run(&pool, &config, command).await?,
        Commands::Ingest {
            channel,
            brand,
            org,
            input,
            provider,
            research_run,
            dry_run,
        } => {
            ingest::run_ingest(
                &pool,
                &config,
                &ingest::IngestArgs {
                    channel,
                    brand,
                    org,
                    input,
                    provider,
                    research_run,
                    dry_run,
                },
            )
            .await?;
        }
        Commands::Research { command } => research::run(&pool, &config, command).await?,
        Commands::Backfill { command } => backfill::run(&pool, &config, command).await?,
        Commands::Runs { command } => runs::run(&pool, command).await?,
    }

    Ok(())
}
