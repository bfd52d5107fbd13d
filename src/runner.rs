use std::path::PathBuf;

use sqlx::{Connection, SqlitePool};
use tracing::{error, info, warn};

use crate::archive::archive_legacy;
use crate::convert::ConvertCounts;
use crate::db::open_legacy_readonly;
use crate::error::MigrationError;
use crate::probe::SchemaCapabilities;
use crate::readers::read_snapshot;
use crate::report::MigrationStats;
use crate::resolve::resolve;
use crate::state::{MigrationState, StateStore};
use crate::writer::write_and_validate;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Everything the run controller needs, passed in as data. The target pool
/// is owned by the caller because the app's schema versioning opens it first.
#[derive(Debug, Clone)]
pub struct MigrationEnv {
    pub legacy_db: PathBuf,
    pub state_file: PathBuf,
    pub archive_dir: PathBuf,
    pub max_attempts: u32,
}

impl MigrationEnv {
    pub fn new(
        legacy_db: impl Into<PathBuf>,
        state_file: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            legacy_db: legacy_db.into(),
            state_file: state_file.into(),
            archive_dir: archive_dir.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Result surface exposed to the caller. Errors (including the distinct
/// abandoned case) come back through [`MigrationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    FreshInstall,
    AlreadyCompleted,
    Success(MigrationStats),
}

/// One-shot, idempotent migration run.
///
/// The caller must await this before opening the target store for normal
/// use; that ordering is the whole point of the synchronous surface. The
/// legacy store is read-only throughout and only archived after validation
/// passes.
pub async fn run_migration(
    pool: &SqlitePool,
    env: &MigrationEnv,
) -> Result<MigrationOutcome, MigrationError> {
    let store = StateStore::new(&env.state_file);
    let _lock = store.try_lock()?.ok_or(MigrationError::Locked)?;
    let mut state = store.load()?;

    if state.completed {
        info!(target: "hearthbook", event = "migration_already_completed");
        return Ok(MigrationOutcome::AlreadyCompleted);
    }
    if state.attempts >= env.max_attempts {
        warn!(
            target: "hearthbook",
            event = "migration_abandoned",
            attempts = state.attempts,
            max_attempts = env.max_attempts
        );
        return Err(MigrationError::AttemptsExhausted {
            attempts: state.attempts,
        });
    }

    if !env.legacy_db.exists() {
        info!(target: "hearthbook", event = "migration_fresh_install", reason = "no_legacy_file");
        mark_complete(&store, &mut state)?;
        return Ok(MigrationOutcome::FreshInstall);
    }

    info!(
        target: "hearthbook",
        event = "migration_start",
        attempt = state.attempts + 1,
        legacy = %env.legacy_db.display()
    );

    // An unopenable legacy file is an environment error: report it without
    // touching the attempt counter or either store.
    let mut legacy = open_legacy_readonly(&env.legacy_db)
        .await
        .map_err(MigrationError::LegacyOpen)?;

    let caps = SchemaCapabilities::probe(&mut legacy).await?;
    if !caps.any_legacy_table() {
        legacy.close().await.ok();
        info!(target: "hearthbook", event = "migration_fresh_install", reason = "no_legacy_tables");
        mark_complete(&store, &mut state)?;
        return Ok(MigrationOutcome::FreshInstall);
    }

    let attempt = migrate_once(pool, &mut legacy, &caps).await;
    legacy.close().await.ok();

    match attempt {
        Ok(stats) => {
            state.completed = true;
            state.attempts = 0;
            store.save(&state)?;
            archive_legacy(&env.legacy_db, &env.archive_dir)?;
            info!(target: "hearthbook", event = "migration_complete");
            Ok(MigrationOutcome::Success(stats))
        }
        Err(err) => {
            state.attempts += 1;
            store.save(&state)?;
            error!(
                target: "hearthbook",
                event = "migration_failed",
                attempt = state.attempts,
                error = %err
            );
            Err(err)
        }
    }
}

async fn migrate_once(
    pool: &SqlitePool,
    legacy: &mut sqlx::SqliteConnection,
    caps: &SchemaCapabilities,
) -> Result<MigrationStats, MigrationError> {
    let mut counts = ConvertCounts::default();
    let mut stats = MigrationStats::default();

    let mut snapshot = read_snapshot(legacy, caps, &mut counts).await?;
    let joins = resolve(&mut snapshot, caps, &mut stats)?;
    write_and_validate(pool, &snapshot, &joins, &mut stats).await?;

    stats.absorb_convert_counts(&counts);
    Ok(stats)
}

fn mark_complete(store: &StateStore, state: &mut MigrationState) -> Result<(), MigrationError> {
    state.completed = true;
    state.attempts = 0;
    store.save(state)?;
    Ok(())
}
