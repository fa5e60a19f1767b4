use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
}

pub struct AppPaths {
    pub home_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current user.
    ///
    /// # Errors
    /// Returns an error when the user home directory cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
        Ok(Self {
            cache_dir: home.join(".cache").join("phpswitch"),
            home_dir: home,
        })
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.home_dir.join(".phpswitch.conf")
    }

    #[must_use]
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join("available_versions.cache")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join("phpswitch.log")
    }

    /// Ensure the cache directory exists on disk.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }
}
