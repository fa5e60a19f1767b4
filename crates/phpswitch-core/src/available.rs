use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use phpswitch_backend::{AvailablePhp, PackageRegistry, PhpVersion, RegistryError};

use crate::cache::DiskCache;

/// The available-version listing handed to callers, with enough provenance
/// to tell fresh data from a stale fallback.
#[derive(Debug)]
pub struct AvailableListing {
    pub versions: Vec<AvailablePhp>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
    pub stale: bool,
}

/// Layers the one-hour disk cache over the slow registry search, so that
/// discovery never blocks switching among already-installed versions.
pub struct AvailableVersions {
    registry: Arc<dyn PackageRegistry>,
    cache_path: PathBuf,
    ttl: TimeDelta,
}

impl AvailableVersions {
    #[must_use]
    pub fn new(registry: Arc<dyn PackageRegistry>, cache_path: PathBuf) -> Self {
        Self {
            registry,
            cache_path,
            ttl: TimeDelta::hours(1),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    /// List the known PHP versions, each tagged installed or not.
    ///
    /// With `use_cache`, a fresh cache answers without any external call.
    /// Otherwise the registry is searched; on success the cache is
    /// overwritten, on failure any existing cache (however old) is returned
    /// flagged stale.
    ///
    /// # Errors
    /// Fails with the underlying [`RegistryError`] only when the search
    /// fails and no cache exists at all.
    pub async fn list(&self, use_cache: bool) -> Result<AvailableListing, RegistryError> {
        if use_cache
            && let Some(cache) = DiskCache::load_from_path(&self.cache_path)
            && cache.is_fresh(self.ttl)
        {
            debug!(
                "Using cached available-version listing from {}",
                cache.fetched_at
            );
            return Ok(AvailableListing {
                versions: cache.versions,
                fetched_at: cache.fetched_at,
                from_cache: true,
                stale: false,
            });
        }

        match self.fetch_remote().await {
            Ok(versions) => {
                let fetched_at = Utc::now();
                let cache = DiskCache {
                    versions: versions.clone(),
                    fetched_at,
                };
                if let Err(error) = cache.save_to_path(&self.cache_path) {
                    warn!(
                        "Could not write {}: {error}",
                        self.cache_path.display()
                    );
                }
                Ok(AvailableListing {
                    versions,
                    fetched_at,
                    from_cache: false,
                    stale: false,
                })
            }
            Err(error) => match DiskCache::load_from_path(&self.cache_path) {
                Some(cache) => {
                    warn!(
                        "Registry search failed ({error}), falling back to the cached listing from {}",
                        cache.fetched_at
                    );
                    Ok(AvailableListing {
                        versions: cache.versions,
                        fetched_at: cache.fetched_at,
                        from_cache: true,
                        stale: true,
                    })
                }
                None => Err(error),
            },
        }
    }

    /// Force a registry search, bypassing and then refilling the cache.
    ///
    /// # Errors
    /// Same policy as [`Self::list`].
    pub async fn refresh(&self) -> Result<AvailableListing, RegistryError> {
        self.list(false).await
    }

    /// Drop the cache file; reports whether anything was deleted.
    ///
    /// # Errors
    /// Propagates filesystem errors other than the file being absent.
    pub fn clear(&self) -> std::io::Result<bool> {
        DiskCache::clear(&self.cache_path)
    }

    async fn fetch_remote(&self) -> Result<Vec<AvailablePhp>, RegistryError> {
        let (available, installed) = tokio::join!(
            self.registry.search_available(),
            self.registry.list_installed()
        );
        let available = available?;
        let installed: HashSet<PhpVersion> = installed?
            .into_iter()
            .map(|record| record.version)
            .collect();

        Ok(available
            .into_iter()
            .map(|version| AvailablePhp {
                installed: installed.contains(&version),
                version,
            })
            .collect())
    }
}
