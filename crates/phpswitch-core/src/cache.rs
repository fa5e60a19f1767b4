use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use phpswitch_backend::AvailablePhp;
use phpswitch_platform::write_atomic;

/// On-disk snapshot of the available-version listing plus its fetch time.
#[derive(Debug, Serialize, Deserialize)]
pub struct DiskCache {
    pub versions: Vec<AvailablePhp>,
    pub fetched_at: DateTime<Utc>,
}

impl DiskCache {
    #[must_use]
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// # Errors
    /// Returns an error when the cache directory cannot be created or the
    /// snapshot cannot be written.
    pub fn save_to_path(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(self).map_err(std::io::Error::other)?;
        write_atomic(path, &data)
    }

    #[must_use]
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.fetched_at
    }

    #[must_use]
    pub fn is_fresh(&self, ttl: TimeDelta) -> bool {
        self.age() < ttl
    }

    /// Remove the cache file; reports whether anything was deleted.
    ///
    /// # Errors
    /// Returns an error for any failure other than the file being absent.
    pub fn clear(path: &Path) -> std::io::Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }
}
