use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Persisted control state for the run: the completion flag and the
/// consecutive-failure counter. Lives outside either database, loaded at the
/// start of every run and written at its end — passed around as data, never
/// ambient globals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationState {
    pub completed: bool,
    pub attempts: u32,
}

/// JSON-file backing for [`MigrationState`], plus the advisory lock that
/// keeps two processes from racing the same migration.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

/// Held for the duration of a run; the lock releases when dropped.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".lock");
        PathBuf::from(os)
    }

    fn io_err(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Take the cross-process advisory lock. The completion flag alone is
    /// not a lock; this is what makes concurrent invocations safe.
    pub fn try_lock(&self) -> Result<Option<StateLock>, StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(|e| self.io_err(e))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(StateLock { _file: file })),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(self.io_err(err)),
        }
    }

    pub fn load(&self) -> Result<MigrationState, StateError> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StateError::Parse {
                path: self.path.display().to_string(),
                source: e,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(MigrationState::default())
            }
            Err(err) => Err(self.io_err(err)),
        }
    }

    /// Write atomically via tmp + rename so a crash mid-save cannot corrupt
    /// the flag file.
    pub fn save(&self, state: &MigrationState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StateError::Parse {
            path: self.path.display().to_string(),
            source: e,
        })?;
        fs::write(&tmp, bytes).map_err(|e| self.io_err(e))?;
        if let Ok(file) = File::open(&tmp) {
            file.sync_all().map_err(|e| self.io_err(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// External reset hook (e.g. an app upgrade) that clears the attempt
    /// counter so an abandoned migration can be retried.
    pub fn reset_attempts(&self) -> Result<MigrationState, StateError> {
        let mut state = self.load()?;
        state.attempts = 0;
        self.save(&state)?;
        Ok(state)
    }
}
