//! Task runner trait and the command-backed implementation.

use crate::pipeline::InitTask;
use async_trait::async_trait;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;

/// Why a task did not succeed.
#[derive(Debug)]
pub(crate) enum FailureReason {
    /// Exited with a non-zero code
    Code(i32),

    /// Terminated by a signal
    Signal(i32),

    /// Could not be started at all (missing binary, bad workdir, ...)
    Spawn(std::io::Error),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Code(code) => write!(f, "exit status {}", code),
            FailureReason::Signal(signo) => write!(f, "killed by signal {}", signo),
            FailureReason::Spawn(e) => write!(f, "failed to start: {}", e),
        }
    }
}

impl From<std::process::ExitStatus> for FailureReason {
    fn from(status: std::process::ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => FailureReason::Code(code),
            (None, Some(signo)) => FailureReason::Signal(signo),
            (None, None) => FailureReason::Code(-1),
        }
    }
}

/// Runs a single init task to completion.
#[async_trait]
pub(crate) trait TaskRunner: Send + Sync {
    async fn run(&self, task: &InitTask) -> Result<(), FailureReason>;
}

/// Runs tasks as child processes sharing the orchestrator's stdout/stderr.
pub(crate) struct CommandRunner;

#[async_trait]
impl TaskRunner for CommandRunner {
    async fn run(&self, task: &InitTask) -> Result<(), FailureReason> {
        use tokio::process::Command;

        let mut cmd = Command::new(task.program());
        cmd.args(task.args())
            .envs(&task.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // An interrupted boot must not leave the task running
            .kill_on_drop(true);

        if let Some(dir) = &task.workdir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().await.map_err(FailureReason::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(status.into())
        }
    }
}
