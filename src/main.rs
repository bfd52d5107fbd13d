#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hearthbook_migration::{
    db, migrate, run_migration, MigrationEnv, MigrationError, MigrationOutcome, StateStore,
    DEFAULT_MAX_ATTEMPTS,
};

#[derive(Parser)]
#[command(name = "hearthbook-migrate", about = "Hearthbook legacy store migration")]
struct Cli {
    /// Target database path
    #[arg(long, value_name = "PATH")]
    target: PathBuf,

    /// Legacy database path (may be absent on fresh installs)
    #[arg(long, value_name = "PATH")]
    legacy: PathBuf,

    /// Migration state file; defaults to <target dir>/migration-state.json
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// Backup directory; defaults to <target dir>/legacy-backup
    #[arg(long, value_name = "PATH")]
    archive_dir: Option<PathBuf>,

    /// Consecutive failures before the migration is abandoned
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the migration (no-op when already completed)
    Run,
    /// Show the persisted migration state
    Status,
    /// Clear the attempt counter so an abandoned migration can retry
    ResetAttempts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("HEARTHBOOK_LOG").unwrap_or_else(|_| "hearthbook=info,sqlx=warn".into()),
        )
        .with_target(true)
        .try_init();

    let cli = Cli::parse();
    let base = cli
        .target
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let state_file = cli
        .state
        .unwrap_or_else(|| base.join("migration-state.json"));
    let archive_dir = cli.archive_dir.unwrap_or_else(|| base.join("legacy-backup"));

    let store = StateStore::new(&state_file);

    match cli.cmd {
        Cmd::Status => {
            let state = store.load()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Cmd::ResetAttempts => {
            let state = store.reset_attempts()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Cmd::Run => {
            let pool = db::open_target_pool(&cli.target).await?;
            migrate::apply_migrations(&pool)
                .await
                .map_err(MigrationError::Schema)?;

            let env = MigrationEnv::new(cli.legacy, state_file, archive_dir)
                .with_max_attempts(cli.max_attempts);
            match run_migration(&pool, &env).await? {
                MigrationOutcome::FreshInstall => println!("fresh install; nothing to migrate"),
                MigrationOutcome::AlreadyCompleted => println!("migration already completed"),
                MigrationOutcome::Success(stats) => {
                    println!("{}", serde_json::to_string_pretty(&stats)?)
                }
            }
            pool.close().await;
            Ok(())
        }
    }
}
