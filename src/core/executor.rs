//! Local process execution for pipeline stages.
//!
//! Commands are spawned directly (no shell) with stdio inherited, so the
//! delegated tool's own output is what the operator sees. The call blocks
//! until the tool exits; there is no timeout.

use std::io::ErrorKind;
use std::process::{Command, ExitStatus, Stdio};

use crate::pipeline::{Stage, StageCommand, StageExecutor};

/// Exit status reported when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit status reported when the program exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl StageExecutor for ProcessExecutor {
    fn execute(&self, stage: &Stage, command: &StageCommand) -> i32 {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);

        if let Some(dir) = &stage.working_dir {
            cmd.current_dir(dir);
        }

        cmd.envs(&stage.env);

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();

        match status {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                eprintln!("launchpad: {}: {}", command.program, e);
                match e.kind() {
                    ErrorKind::NotFound => EXIT_NOT_FOUND,
                    ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
                    _ => 1,
                }
            }
        }
    }
}

/// Map a process status to a shell-style exit code.
///
/// Signal termination becomes `128 + signal` on Unix.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
