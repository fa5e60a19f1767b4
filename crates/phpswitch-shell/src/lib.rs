#![allow(clippy::missing_errors_doc)]

mod backup;
mod detect;
mod dialect;
mod sync;

pub use backup::{create_backup, list_backups, prune_backups};
pub use detect::ShellKind;
pub use dialect::{BLOCK_BEGIN, BLOCK_END, render_path_block, replace_block};
pub use sync::{ShellSync, SyncError, SyncOutcome};
