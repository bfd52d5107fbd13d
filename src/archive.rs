use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::ArchiveError;

/// SQLite sidecar suffixes that must travel with the main file.
const SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

/// Files moved by a successful archive step.
#[derive(Debug, Default)]
pub struct ArchivedFiles {
    pub destination: PathBuf,
    pub moved: Vec<PathBuf>,
}

fn io_err(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Move (never delete) the legacy store and its journal sidecars into a
/// timestamped backup directory. Runs only after validation has passed. An
/// existing backup is never overwritten; a fresh directory name is chosen
/// instead.
pub fn archive_legacy(legacy_db: &Path, archive_dir: &Path) -> Result<ArchivedFiles, ArchiveError> {
    fs::create_dir_all(archive_dir).map_err(|e| io_err(archive_dir, e))?;

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let mut destination = archive_dir.join(format!("legacy_{stamp}"));
    let mut counter = 0u32;
    while destination.exists() {
        counter += 1;
        if counter > 1000 {
            return Err(ArchiveError::DestinationExists {
                path: destination.display().to_string(),
            });
        }
        destination = archive_dir.join(format!("legacy_{stamp}_{counter}"));
    }
    fs::create_dir_all(&destination).map_err(|e| io_err(&destination, e))?;

    let mut archived = ArchivedFiles {
        destination: destination.clone(),
        moved: Vec::new(),
    };

    let mut sources = vec![legacy_db.to_path_buf()];
    for suffix in SIDECAR_SUFFIXES {
        let mut os = legacy_db.as_os_str().to_owned();
        os.push(suffix);
        sources.push(PathBuf::from(os));
    }

    for source in sources {
        if !source.exists() {
            continue;
        }
        let name = source
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_default();
        let target = destination.join(name);
        if target.exists() {
            return Err(ArchiveError::DestinationExists {
                path: target.display().to_string(),
            });
        }
        move_file(&source, &target)?;
        archived.moved.push(target);
    }

    info!(
        target: "hearthbook",
        event = "legacy_archived",
        destination = %destination.display(),
        files = archived.moved.len()
    );

    Ok(archived)
}

/// Rename when possible; fall back to copy+remove for cross-device moves.
fn move_file(source: &Path, target: &Path) -> Result<(), ArchiveError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, target).map_err(|e| io_err(source, e))?;
            fs::remove_file(source).map_err(|e| io_err(source, e))?;
            Ok(())
        }
    }
}
