//! Ingest run inspection commands.

use clap::Subcommand;

/// Sub-commands available under `runs`.
#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List recent ingest runs, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

/// Dispatch a `runs` sub-command.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn run(pool: &sqlx::PgPool, command: RunsCommands) -> anyhow::Result<()> {
    match command {
        RunsCommands::List { limit } => {
            let runs = adscope_db::list_ad_ingest_runs(pool, limit).await?;
            if runs.is_empty() {
                println!("no ingest runs recorded");
                return Ok(());
            }
            for run in runs {
                let detail = match (run.empty_reason.as_deref(), run.error_message.as_deref()) {
                    (Some(reason), _) => format!(" ({reason})"),
                    (None, Some(error)) => format!(" ({error})"),
                    (None, None) => String::new(),
                };
                println!(
                    "{} {:>9} {} items={}/{} failed={}{}",
                    run.created_at.format("%Y-%m-%d %H:%M:%S"),
                    run.status,
                    run.provider,
                    run.items_succeeded,
                    run.items_total,
                    run.items_failed,
                    detail
                );
            }
            Ok(())
        }
    }
}
