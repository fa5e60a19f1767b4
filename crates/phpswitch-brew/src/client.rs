use async_trait::async_trait;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;
use which::which;

use phpswitch_backend::{InstalledPhp, PackageRegistry, PhpVersion, RegistryError};
use phpswitch_platform::run_with_timeout;

use crate::parse::{formula_from_cellar_path, parse_installed_formulae, parse_search_output};
use crate::services::BrewServices;

/// Per-operation bounds on brew invocations. Installs compile from source
/// on older macOS versions, so that bound is far looser than the rest.
#[derive(Debug, Clone, Copy)]
pub struct BrewTimeouts {
    pub query: Duration,
    pub search: Duration,
    pub link: Duration,
    pub install: Duration,
    pub service: Duration,
}

impl Default for BrewTimeouts {
    fn default() -> Self {
        Self {
            query: Duration::from_secs(30),
            search: Duration::from_secs(120),
            link: Duration::from_secs(60),
            install: Duration::from_secs(1800),
            service: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct BrewClient {
    brew_path: PathBuf,
    prefix: PathBuf,
    timeouts: BrewTimeouts,
}

impl BrewClient {
    /// Locate brew and resolve its prefix.
    ///
    /// # Errors
    /// Returns [`RegistryError::Unavailable`] when no brew binary can be
    /// found, and propagates errors from the `brew --prefix` probe.
    pub async fn detect() -> Result<Self, RegistryError> {
        let timeouts = BrewTimeouts::default();
        let brew_path = find_brew().ok_or_else(|| {
            RegistryError::unavailable(
                "brew not found on PATH or in the usual install locations",
            )
        })?;
        debug!("Using brew at {}", brew_path.display());

        let output = run_with_timeout(&brew_path, &["--prefix"], timeouts.query)
            .await
            .map_err(|error| RegistryError::unavailable(error.to_string()))?;
        if output.timed_out {
            return Err(RegistryError::Timeout {
                seconds: timeouts.query.as_secs(),
            });
        }
        if !output.success() {
            return Err(RegistryError::unavailable(output.stderr.trim().to_string()));
        }

        let prefix = PathBuf::from(output.stdout.trim());
        debug!("Homebrew prefix: {}", prefix.display());

        Ok(Self {
            brew_path,
            prefix,
            timeouts,
        })
    }

    /// Build a client around known paths without probing, for callers that
    /// already resolved them (and for tests).
    #[must_use]
    pub fn with_paths(brew_path: PathBuf, prefix: PathBuf) -> Self {
        Self {
            brew_path,
            prefix,
            timeouts: BrewTimeouts::default(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: BrewTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// A service controller sharing this client's brew binary.
    #[must_use]
    pub fn services(&self) -> BrewServices {
        BrewServices::new(self.brew_path.clone(), self.timeouts.service)
    }

    async fn execute(&self, args: &[&str], timeout: Duration) -> Result<String, RegistryError> {
        info!("Executing brew {}", args.join(" "));

        let output = run_with_timeout(&self.brew_path, args, timeout)
            .await
            .map_err(|error| RegistryError::unavailable(error.to_string()))?;

        if output.timed_out {
            return Err(RegistryError::Timeout {
                seconds: timeout.as_secs(),
            });
        }

        if output.success() {
            debug!("brew command succeeded, output: {} bytes", output.stdout.len());
            Ok(output.stdout)
        } else {
            let stderr = output.stderr.trim().to_string();
            error!("brew command failed: args={args:?}, stderr='{stderr}'");
            Err(RegistryError::CommandFailed { stderr })
        }
    }
}

fn find_brew() -> Option<PathBuf> {
    if let Ok(path) = which("brew") {
        return Some(path);
    }

    [
        "/opt/homebrew/bin/brew",
        "/usr/local/bin/brew",
        "/home/linuxbrew/.linuxbrew/bin/brew",
    ]
    .into_iter()
    .map(PathBuf::from)
    .find(|path| path.exists())
}

#[async_trait]
impl PackageRegistry for BrewClient {
    async fn list_installed(&self) -> Result<Vec<InstalledPhp>, RegistryError> {
        let output = self
            .execute(&["list", "--formula", "--versions"], self.timeouts.query)
            .await?;
        let linked = self.linked_formula().await?;

        Ok(parse_installed_formulae(&output)
            .into_iter()
            .map(|(formula, version)| InstalledPhp {
                opt_prefix: self.prefix.join("opt").join(&formula),
                linked: linked == Some(version),
                version,
                formula,
            })
            .collect())
    }

    async fn search_available(&self) -> Result<Vec<PhpVersion>, RegistryError> {
        let output = self
            .execute(&["search", "--formula", "php"], self.timeouts.search)
            .await?;
        Ok(parse_search_output(&output))
    }

    async fn linked_formula(&self) -> Result<Option<PhpVersion>, RegistryError> {
        let link = self.prefix.join("bin").join("php");
        match std::fs::read_link(&link) {
            Ok(target) => Ok(formula_from_cellar_path(&target)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn link(&self, version: &PhpVersion) -> Result<(), RegistryError> {
        let formula = version.formula();
        // --force because the versioned formulae are keg-only.
        match self
            .execute(
                &["link", "--overwrite", "--force", &formula],
                self.timeouts.link,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(RegistryError::CommandFailed { stderr }) => {
                Err(RegistryError::link_failed(formula, stderr))
            }
            Err(other) => Err(other),
        }
    }

    async fn unlink(&self, version: &PhpVersion) -> Result<(), RegistryError> {
        let formula = version.formula();
        match self.execute(&["unlink", &formula], self.timeouts.link).await {
            Ok(_) => Ok(()),
            // Unlinking a formula that is not linked is a no-op for us.
            Err(RegistryError::CommandFailed { stderr }) if stderr.contains("not linked") => {
                debug!("{formula} was not linked, nothing to unlink");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    async fn install(&self, version: &PhpVersion) -> Result<(), RegistryError> {
        let formula = version.formula();
        self.execute(&["install", &formula], self.timeouts.install)
            .await?;
        Ok(())
    }

    async fn uninstall(&self, version: &PhpVersion) -> Result<(), RegistryError> {
        let formula = version.formula();
        self.execute(&["uninstall", &formula], self.timeouts.install)
            .await?;
        Ok(())
    }
}
