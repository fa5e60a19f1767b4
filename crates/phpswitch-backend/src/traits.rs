use async_trait::async_trait;

use crate::error::{RegistryError, ServiceError};
use crate::types::{InstalledPhp, PhpVersion};

/// Queries and mutations against the package manager's formula state.
///
/// Every implementation is expected to bound its external calls with a
/// timeout; a hung package manager must surface as
/// [`RegistryError::Timeout`], never as a hang.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn list_installed(&self) -> Result<Vec<InstalledPhp>, RegistryError>;

    /// The full set of PHP formulae the registry knows about, installed or
    /// not, ascending. This is the slow discovery query; callers layer a
    /// cache over it.
    async fn search_available(&self) -> Result<Vec<PhpVersion>, RegistryError>;

    /// The formula currently exposed as the unversioned `php` binary, or
    /// `None` when nothing in the family is linked.
    async fn linked_formula(&self) -> Result<Option<PhpVersion>, RegistryError>;

    async fn link(&self, version: &PhpVersion) -> Result<(), RegistryError>;

    async fn unlink(&self, version: &PhpVersion) -> Result<(), RegistryError>;

    async fn install(&self, version: &PhpVersion) -> Result<(), RegistryError>;

    async fn uninstall(&self, version: &PhpVersion) -> Result<(), RegistryError>;
}

/// Control over the background services bound to each formula.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Names of the PHP-family services currently reported as running.
    async fn running_services(&self) -> Result<Vec<String>, ServiceError>;

    async fn start(&self, service: &str) -> Result<(), ServiceError>;

    /// Stopping a service that is not running counts as success.
    async fn stop(&self, service: &str) -> Result<(), ServiceError>;
}
