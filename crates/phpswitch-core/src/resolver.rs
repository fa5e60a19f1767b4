use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use phpswitch_backend::{PackageRegistry, PhpVersion, RegistryError};
use phpswitch_platform::run_with_timeout;

/// What the search path actually resolves to, cross-checked against the
/// package manager's link state.
#[derive(Debug, Clone)]
pub struct ActiveVersion {
    /// Version reported by the first `php` on PATH, when one works.
    pub resolved: Option<PhpVersion>,
    pub binary: Option<PathBuf>,
    pub linked: Option<PhpVersion>,
    /// Set when the binary on PATH disagrees with the linked formula, the
    /// usual sign of a stale PATH entry shadowing the new link.
    pub path_inconsistent: bool,
}

pub struct VersionResolver {
    registry: Arc<dyn PackageRegistry>,
    query_timeout: Duration,
}

impl VersionResolver {
    #[must_use]
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        Self {
            registry,
            query_timeout: Duration::from_secs(10),
        }
    }

    /// The formula the package manager currently links, or `None`.
    ///
    /// # Errors
    /// Propagates [`RegistryError`] from the link-metadata read.
    pub async fn linked_version(&self) -> Result<Option<PhpVersion>, RegistryError> {
        self.registry.linked_formula().await
    }

    /// Resolve the version that is actually active. Diagnostic-grade: this
    /// never fails, it degrades to `resolved: None`.
    pub async fn active_version(&self) -> ActiveVersion {
        let linked = self.registry.linked_formula().await.ok().flatten();
        let binary = which::which("php").ok();

        let resolved = match &binary {
            Some(path) => query_binary_version(path, self.query_timeout).await,
            None => None,
        };

        debug!(
            "Active version: binary={:?}, resolved={:?}, linked={:?}",
            binary, resolved, linked
        );

        ActiveVersion {
            path_inconsistent: is_path_inconsistent(linked, resolved),
            resolved,
            binary,
            linked,
        }
    }
}

async fn query_binary_version(path: &Path, timeout: Duration) -> Option<PhpVersion> {
    let output = run_with_timeout(path, &["-v"], timeout).await.ok()?;
    if !output.success() {
        return None;
    }
    parse_php_version_output(&output.stdout)
}

/// Parse the first line of `php -v` ("PHP 8.1.27 (cli) (built: ...)") down
/// to its major.minor identifier.
#[must_use]
pub fn parse_php_version_output(output: &str) -> Option<PhpVersion> {
    let rest = output.trim_start().strip_prefix("PHP ")?;
    let token = rest.split_whitespace().next()?;
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some(PhpVersion::new(major, minor))
}

fn is_path_inconsistent(linked: Option<PhpVersion>, observed: Option<PhpVersion>) -> bool {
    match (linked, observed) {
        // The unsuffixed formula's numeric version is not knowable from
        // link metadata alone, so there is nothing to cross-check.
        (Some(PhpVersion::Default), _) => false,
        (Some(linked), Some(observed)) => linked != observed,
        _ => false,
    }
}
