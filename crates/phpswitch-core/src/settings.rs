use log::warn;
use std::path::Path;

use phpswitch_backend::PhpVersion;

/// User-level tool configuration, loaded once per invocation from
/// `~/.phpswitch.conf` and passed to the components that need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub auto_restart_services: bool,
    pub backup_enabled: bool,
    pub max_backups: usize,
    pub default_version: Option<PhpVersion>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            auto_restart_services: true,
            backup_enabled: true,
            max_backups: 5,
            default_version: None,
        }
    }
}

impl ToolSettings {
    /// Load settings from `path`. A missing file yields the defaults;
    /// malformed lines and unknown keys are ignored, never fatal.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_conf(&content),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                warn!("Could not read {}: {error}", path.display());
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn from_conf(content: &str) -> Self {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match (key.trim(), value.trim()) {
                ("auto_restart_services", value) => {
                    if let Some(flag) = parse_bool(value) {
                        settings.auto_restart_services = flag;
                    }
                }
                ("backup_enabled", value) => {
                    if let Some(flag) = parse_bool(value) {
                        settings.backup_enabled = flag;
                    }
                }
                ("max_backups", value) => {
                    if let Ok(count) = value.parse() {
                        settings.max_backups = count;
                    }
                }
                ("default_version", value) => {
                    if let Ok(version) = value.parse() {
                        settings.default_version = Some(version);
                    }
                }
                _ => {}
            }
        }

        settings
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
