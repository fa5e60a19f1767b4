mod available;
mod cache;
mod project;
mod resolver;
mod service;
mod settings;
mod switcher;

pub use available::{AvailableListing, AvailableVersions};
pub use cache::DiskCache;
pub use project::{PIN_FILE, find_project_version, write_project_version};
pub use resolver::{ActiveVersion, VersionResolver, parse_php_version_output};
pub use service::{ServiceReconciler, service_name_for};
pub use settings::ToolSettings;
pub use switcher::{SwitchError, SwitchReport, SwitchStage, SwitchWarning, Switcher};
