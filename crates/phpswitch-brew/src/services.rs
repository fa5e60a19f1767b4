use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use phpswitch_backend::{ServiceController, ServiceError};
use phpswitch_platform::{CommandOutput, run_with_timeout};

/// `brew services` wrapper. One instance per brew binary; every call is
/// timeout-bounded so a wedged launchd/systemd interaction cannot hang the
/// switch.
#[derive(Clone)]
pub struct BrewServices {
    brew_path: PathBuf,
    timeout: Duration,
}

impl BrewServices {
    #[must_use]
    pub fn new(brew_path: PathBuf, timeout: Duration) -> Self {
        Self { brew_path, timeout }
    }

    async fn run(&self, args: &[&str], context: &str) -> Result<CommandOutput, ServiceError> {
        info!("Executing brew {}", args.join(" "));

        let output = run_with_timeout(&self.brew_path, args, self.timeout)
            .await
            .map_err(|error| ServiceError::failed(context, error.to_string()))?;

        if output.timed_out {
            return Err(ServiceError::Timeout {
                service: context.to_string(),
                seconds: self.timeout.as_secs(),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl ServiceController for BrewServices {
    async fn running_services(&self) -> Result<Vec<String>, ServiceError> {
        let output = self.run(&["services", "list"], "services list").await?;
        if !output.success() {
            return Err(ServiceError::failed(
                "services list",
                output.stderr.trim().to_string(),
            ));
        }

        Ok(crate::parse::parse_services_list(&output.stdout)
            .into_iter()
            .filter(|(_, running)| *running)
            .map(|(name, _)| name)
            .collect())
    }

    async fn start(&self, service: &str) -> Result<(), ServiceError> {
        let output = self.run(&["services", "start", service], service).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ServiceError::failed(
                service,
                output.stderr.trim().to_string(),
            ))
        }
    }

    async fn stop(&self, service: &str) -> Result<(), ServiceError> {
        let output = self.run(&["services", "stop", service], service).await?;
        if output.success() {
            return Ok(());
        }

        // Stopping an already-stopped service counts as success.
        let stderr = output.stderr.trim().to_string();
        if stderr.contains("not started") || stderr.contains("not running") {
            debug!("{service} was already stopped");
            return Ok(());
        }

        Err(ServiceError::failed(service, stderr))
    }
}
