//! Legacy-to-current store migration and reconciliation engine.
//!
//! Reads an old-generation Hearthbook database (whose schema shifted across
//! several historical generations, none of them version-tagged), rewrites
//! its content into the current schema, repairs missing relationships, and
//! refuses to declare success until the new store is independently verified.

pub mod archive;
pub mod convert;
pub mod db;
pub mod error;
pub mod id;
pub mod migrate;
pub mod model;
pub mod probe;
pub mod readers;
pub mod report;
pub mod resolve;
pub mod runner;
pub mod state;
pub mod time;
pub mod validate;
pub mod writer;

pub use error::{ArchiveError, MigrationError, StateError, ValidationError};
pub use probe::SchemaCapabilities;
pub use report::MigrationStats;
pub use runner::{run_migration, MigrationEnv, MigrationOutcome, DEFAULT_MAX_ATTEMPTS};
pub use state::{MigrationState, StateStore};
