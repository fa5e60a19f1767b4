use chrono::Utc;
use std::path::{Path, PathBuf};

const BACKUP_INFIX: &str = ".phpswitch-backup.";

/// Copy `path` aside under a timestamp suffix and return the copy's path.
///
/// The suffix is second-resolution plus nanoseconds, so rapid successive
/// edits still get distinct, lexicographically ordered names.
pub fn create_backup(path: &Path) -> std::io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
        })?;

    let stamp = Utc::now().format("%Y%m%d-%H%M%S%.9f");
    let backup = path.with_file_name(format!("{file_name}{BACKUP_INFIX}{stamp}"));
    std::fs::copy(path, &backup)?;
    Ok(backup)
}

/// All backups of `path`, oldest first.
pub fn list_backups(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    let Some(file_name) = path.file_name().and_then(std::ffi::OsStr::to_str) else {
        return Ok(Vec::new());
    };
    let prefix = format!("{file_name}{BACKUP_INFIX}");

    let mut backups: Vec<PathBuf> = std::fs::read_dir(parent)?
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .map(|entry| entry.path())
        .collect();

    // The timestamp suffix is fixed-width, so name order is age order.
    backups.sort();
    Ok(backups)
}

/// Delete backups of `path` beyond `max`, oldest first; returns what was
/// removed.
pub fn prune_backups(path: &Path, max: usize) -> std::io::Result<Vec<PathBuf>> {
    let mut backups = list_backups(path)?;
    let mut removed = Vec::new();

    while backups.len() > max {
        let oldest = backups.remove(0);
        std::fs::remove_file(&oldest)?;
        removed.push(oldest);
    }

    Ok(removed)
}
