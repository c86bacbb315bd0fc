//! Backfill command handlers.

use clap::Subcommand;

/// Sub-commands available under `backfill`.
#[derive(Debug, Subcommand)]
pub enum BackfillCommands {
    /// Create creative memberships for ads that have none
    Creatives {
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Create facts rows for ads that have none
    Facts {
        #[arg(long)]
        batch_size: Option<i64>,
    },
    /// Create score rows for ads that have none
    Scores {
        #[arg(long)]
        batch_size: Option<i64>,
    },
}

/// Dispatch a `backfill` sub-command.
///
/// # Errors
///
/// Returns an error if a batch scan fails; per-row failures are counted in
/// the printed report instead.
pub async fn run(
    pool: &sqlx::PgPool,
    config: &adscope_core::AppConfig,
    command: BackfillCommands,
) -> anyhow::Result<()> {
    let (label, report) = match command {
        BackfillCommands::Creatives { batch_size } => {
            let batch = batch_size.unwrap_or(config.backfill_batch_size);
            (
                "creatives",
                adscope_ingest::backfill_ad_creatives(pool, batch).await?,
            )
        }
        BackfillCommands::Facts { batch_size } => {
            let batch = batch_size.unwrap_or(config.backfill_batch_size);
            (
                "facts",
                adscope_ingest::backfill_ad_facts(pool, batch).await?,
            )
        }
        BackfillCommands::Scores { batch_size } => {
            let batch = batch_size.unwrap_or(config.backfill_batch_size);
            (
                "scores",
                adscope_ingest::backfill_ad_scores(pool, batch).await?,
            )
        }
    };

    println!(
        "backfill {label}: processed {} ads in {} batches ({} failed)",
        report.processed, report.batches, report.failed
    );
    Ok(())
}
