use log::{debug, trace, warn};
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// The structured result of one external-process invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }

    fn timed_out() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            code: None,
            timed_out: true,
        }
    }
}

/// Run an external command, bounded by `timeout`.
///
/// A command that exceeds the bound is killed and reported through the
/// `timed_out` flag rather than as an `Err`; spawn failures (missing
/// binary, permissions) are the only error path.
///
/// # Errors
/// Returns an error if the process cannot be spawned or its output cannot
/// be collected.
pub async fn run_with_timeout(
    program: impl AsRef<OsStr>,
    args: &[&str],
    timeout: Duration,
) -> std::io::Result<CommandOutput> {
    let program = program.as_ref();
    debug!(
        "Running {} {} (timeout {}s)",
        program.to_string_lossy(),
        args.join(" "),
        timeout.as_secs()
    );

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            let result = CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                code: output.status.code(),
                timed_out: false,
            };
            trace!(
                "{} exited with {:?}, {} bytes of stdout",
                program.to_string_lossy(),
                result.code,
                result.stdout.len()
            );
            Ok(result)
        }
        Ok(Err(error)) => Err(error),
        Err(_elapsed) => {
            warn!(
                "{} {} did not finish within {}s, killing it",
                program.to_string_lossy(),
                args.join(" "),
                timeout.as_secs()
            );
            Ok(CommandOutput::timed_out())
        }
    }
}
