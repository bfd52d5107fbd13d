use std::path::Path;
use std::str::FromStr;

use anyhow::Result as AnyResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, Pool, Sqlite, SqliteConnection};

/// Open (creating if missing) the target store with WAL and enforced FKs.
pub async fn open_target_pool(db_path: &Path) -> AnyResult<Pool<Sqlite>> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!(target: "hearthbook", event = "target_db_path", path = %db_path.display());

    let opts = SqliteConnectOptions::from_str(&db_path.display().to_string())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .after_connect(|conn, _| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys=ON;")
                    .execute(&mut *conn)
                    .await?;
                sqlx::query("PRAGMA busy_timeout = 5000;")
                    .execute(&mut *conn)
                    .await?;
                Ok::<_, sqlx::Error>(())
            })
        })
        .connect_with(opts)
        .await?;

    Ok(pool)
}

/// Open the legacy store strictly read-only. The run never mutates the
/// legacy file; archiving happens at the filesystem level after this
/// connection is closed.
pub async fn open_legacy_readonly(db_path: &Path) -> Result<SqliteConnection, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(&db_path.display().to_string())?
        .read_only(true)
        .create_if_missing(false);
    let conn = opts.connect().await?;
    tracing::info!(target: "hearthbook", event = "legacy_db_open", path = %db_path.display());
    Ok(conn)
}
