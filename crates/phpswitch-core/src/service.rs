use log::{debug, info};
use std::sync::Arc;

use phpswitch_backend::{PhpVersion, ServiceController, ServiceError};

/// Homebrew runs php-fpm under the formula's own name.
#[must_use]
pub fn service_name_for(version: &PhpVersion) -> String {
    version.formula()
}

/// Keeps at most one PHP service running across the family.
pub struct ServiceReconciler {
    controller: Arc<dyn ServiceController>,
    auto_restart: bool,
}

impl ServiceReconciler {
    #[must_use]
    pub fn new(controller: Arc<dyn ServiceController>, auto_restart: bool) -> Self {
        Self {
            controller,
            auto_restart,
        }
    }

    /// Stop every running PHP service except the kept version's. Failures
    /// are collected, not propagated: the switch itself already happened.
    pub async fn stop_others(&self, keep: &PhpVersion) -> Vec<ServiceError> {
        let keep_name = service_name_for(keep);

        let running = match self.controller.running_services().await {
            Ok(running) => running,
            Err(error) => return vec![error],
        };

        let mut failures = Vec::new();
        for service in running {
            if service == keep_name {
                continue;
            }
            info!("Stopping service {service}");
            if let Err(error) = self.controller.stop(&service).await {
                failures.push(error);
            }
        }
        failures
    }

    /// Stop-then-start the version's service; a no-op success when
    /// auto-restart is disabled in the configuration.
    ///
    /// # Errors
    /// Propagates the first [`ServiceError`] from the stop or start call.
    pub async fn restart(&self, version: &PhpVersion) -> Result<(), ServiceError> {
        if !self.auto_restart {
            debug!("Service auto-restart disabled, leaving {version} alone");
            return Ok(());
        }

        let service = service_name_for(version);
        info!("Restarting service {service}");
        self.controller.stop(&service).await?;
        self.controller.start(&service).await
    }
}
