use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

use phpswitch_platform::write_atomic;

use crate::backup::{create_backup, prune_backups};
use crate::detect::ShellKind;
use crate::dialect::{render_path_block, replace_block};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What one synchronization pass did.
#[derive(Debug)]
pub struct SyncOutcome {
    pub path: PathBuf,
    pub changed: bool,
    pub backup: Option<PathBuf>,
}

/// Rewrites the marker block in one shell startup file. Unchanged content
/// is never rewritten (and never backed up), which is what makes repeated
/// switches to the same version byte-stable.
pub struct ShellSync {
    shell: ShellKind,
    startup_file: PathBuf,
    backups_enabled: bool,
    max_backups: usize,
}

impl ShellSync {
    #[must_use]
    pub fn new(shell: ShellKind, startup_file: PathBuf) -> Self {
        Self {
            shell,
            startup_file,
            backups_enabled: true,
            max_backups: 5,
        }
    }

    #[must_use]
    pub fn for_home(shell: ShellKind, home: &Path) -> Self {
        let startup_file = shell.startup_file(home);
        Self::new(shell, startup_file)
    }

    #[must_use]
    pub fn with_backups(mut self, enabled: bool, max_backups: usize) -> Self {
        self.backups_enabled = enabled;
        self.max_backups = max_backups;
        self
    }

    #[must_use]
    pub fn startup_file(&self) -> &Path {
        &self.startup_file
    }

    /// Place `bin_dir` and `sbin_dir` first on the search path by rewriting
    /// the startup file's marker block.
    pub fn update_config(&self, bin_dir: &Path, sbin_dir: &Path) -> Result<SyncOutcome, SyncError> {
        let existing = match std::fs::read_to_string(&self.startup_file) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(SyncError::ReadFailed {
                    path: self.startup_file.clone(),
                    source,
                });
            }
        };

        let block = render_path_block(self.shell, bin_dir, sbin_dir);
        let updated = replace_block(&existing, &block);

        if updated == existing {
            debug!(
                "{} already points at {}, nothing to do",
                self.startup_file.display(),
                bin_dir.display()
            );
            return Ok(SyncOutcome {
                path: self.startup_file.clone(),
                changed: false,
                backup: None,
            });
        }

        if let Some(parent) = self.startup_file.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| SyncError::WriteFailed {
                path: self.startup_file.clone(),
                source,
            })?;
        }

        let backup = if self.backups_enabled && self.startup_file.exists() {
            let copy = create_backup(&self.startup_file).map_err(|source| {
                SyncError::BackupFailed {
                    path: self.startup_file.clone(),
                    source,
                }
            })?;
            debug!("Backed up {} to {}", self.startup_file.display(), copy.display());
            Some(copy)
        } else {
            None
        };

        write_atomic(&self.startup_file, updated.as_bytes()).map_err(|source| {
            SyncError::WriteFailed {
                path: self.startup_file.clone(),
                source,
            }
        })?;

        if self.backups_enabled {
            match prune_backups(&self.startup_file, self.max_backups) {
                Ok(removed) if !removed.is_empty() => {
                    debug!("Pruned {} old backups", removed.len());
                }
                Ok(_) => {}
                // Retention is housekeeping; a failed prune must not fail
                // an otherwise-complete sync.
                Err(error) => warn!("Could not prune backups: {error}"),
            }
        }

        info!(
            "Updated {} to prepend {}",
            self.startup_file.display(),
            bin_dir.display()
        );

        Ok(SyncOutcome {
            path: self.startup_file.clone(),
            changed: true,
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::ShellSync;
    use crate::backup::list_backups;
    use crate::detect::ShellKind;
    use crate::dialect::BLOCK_BEGIN;

    fn opt_dirs(version: &str) -> (PathBuf, PathBuf) {
        let opt = PathBuf::from(format!("/opt/homebrew/opt/php@{version}"));
        (opt.join("bin"), opt.join("sbin"))
    }

    #[test]
    fn creates_missing_startup_file() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join(".zshrc");
        let sync = ShellSync::new(ShellKind::Zsh, path.clone());
        let (bin, sbin) = opt_dirs("8.1");

        let outcome = sync.update_config(&bin, &sbin).expect("sync should succeed");

        assert!(outcome.changed);
        assert!(outcome.backup.is_none());
        let content = std::fs::read_to_string(&path).expect("file should exist");
        assert!(content.contains("php@8.1/bin"));
    }

    #[test]
    fn second_application_is_a_noop() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join(".bashrc");
        std::fs::write(&path, "# mine\n").expect("seed file should be written");
        let sync = ShellSync::new(ShellKind::Bash, path.clone());
        let (bin, sbin) = opt_dirs("8.2");

        let first = sync.update_config(&bin, &sbin).expect("first sync");
        let after_first = std::fs::read_to_string(&path).expect("read after first");
        let second = sync.update_config(&bin, &sbin).expect("second sync");
        let after_second = std::fs::read_to_string(&path).expect("read after second");

        assert!(first.changed);
        assert!(!second.changed);
        assert!(second.backup.is_none());
        assert_eq!(after_first, after_second);
        // Only the first edit produced a backup.
        assert_eq!(list_backups(&path).expect("listing").len(), 1);
    }

    #[test]
    fn switching_versions_replaces_the_block() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join(".zshrc");
        std::fs::write(&path, "# keep\n").expect("seed file should be written");
        let sync = ShellSync::new(ShellKind::Zsh, path.clone());

        let (bin, sbin) = opt_dirs("8.1");
        sync.update_config(&bin, &sbin).expect("first sync");
        let (bin, sbin) = opt_dirs("8.2");
        sync.update_config(&bin, &sbin).expect("second sync");

        let content = std::fs::read_to_string(&path).expect("file should exist");
        assert!(content.contains("# keep"));
        assert!(content.contains("php@8.2/bin"));
        assert!(!content.contains("php@8.1"));
        assert_eq!(content.matches(BLOCK_BEGIN).count(), 1);
    }

    #[test]
    fn retention_keeps_the_n_most_recent_backups() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join(".zshrc");
        std::fs::write(&path, "# seed\n").expect("seed file should be written");
        let sync = ShellSync::new(ShellKind::Zsh, path.clone()).with_backups(true, 2);

        // Alternate versions so every edit actually rewrites the file.
        for version in ["8.0", "8.1", "8.2", "8.1", "8.3"] {
            let (bin, sbin) = opt_dirs(version);
            sync.update_config(&bin, &sbin).expect("sync should succeed");
        }

        let backups = list_backups(&path).expect("listing should succeed");
        assert_eq!(backups.len(), 2);
        // The survivors are the two most recent: the files backing up the
        // pre-"8.1" and pre-"8.3" states.
        let newest =
            std::fs::read_to_string(backups.last().expect("newest backup")).expect("readable");
        assert!(newest.contains("php@8.1"));
    }

    #[test]
    fn disabled_backups_leave_no_copies() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = temp_dir.path().join(".bashrc");
        std::fs::write(&path, "# seed\n").expect("seed file should be written");
        let sync = ShellSync::new(ShellKind::Bash, path.clone()).with_backups(false, 5);
        let (bin, sbin) = opt_dirs("8.1");

        let outcome = sync.update_config(&bin, &sbin).expect("sync should succeed");

        assert!(outcome.changed);
        assert!(outcome.backup.is_none());
        assert!(list_backups(&path).expect("listing").is_empty());
    }

    #[test]
    fn fish_config_parent_directory_is_created() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let home = temp_dir.path();
        let sync = ShellSync::for_home(ShellKind::Fish, home);
        let (bin, sbin) = opt_dirs("8.2");

        sync.update_config(&bin, &sbin).expect("sync should succeed");

        let content = std::fs::read_to_string(home.join(".config/fish/config.fish"))
            .expect("fish config should exist");
        assert!(content.contains("fish_add_path"));
    }
}
