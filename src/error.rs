use thiserror::Error;

/// Errors surfaced by the migration run.
///
/// The taxonomy follows the run controller's contract: environment errors
/// abort without touching state, structural errors fail the whole run and
/// bump the persisted attempt counter, and `AttemptsExhausted` is the
/// distinct terminal result the caller must stop retrying on.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("legacy store could not be opened: {0}")]
    LegacyOpen(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("legacy store holds content but no home row survived resolution")]
    NoHomes,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("migration abandoned after {attempts} failed attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("another process holds the migration lock")]
    Locked,

    #[error("failed to apply target schema: {0}")]
    Schema(#[source] anyhow::Error),
}

/// Post-write verification failures. Any of these rolls the transaction back.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("row count mismatch for {table}: expected {expected}, found {actual}")]
    CountMismatch {
        table: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("{count} dangling reference(s) in {table}.{column}")]
    DanglingReference {
        table: &'static str,
        column: &'static str,
        count: u64,
    },

    #[error("invalid stable identifier {value:?} in {table}")]
    InvalidIdentifier { table: &'static str, value: String },

    #[error("database error during validation: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failures while reading or writing the persisted migration state file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while moving the legacy store into its backup location.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to archive {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backup destination {path} already exists")]
    DestinationExists { path: String },
}
