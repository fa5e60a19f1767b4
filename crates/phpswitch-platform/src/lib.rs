mod exec;
mod fs;
mod paths;

pub use exec::{CommandOutput, run_with_timeout};
pub use fs::write_atomic;
pub use paths::{AppPaths, AppPathsError};
