//! Auxiliary service launcher.
//!
//! Starts a diagnostic daemon (typically sshd) next to the application.
//! The daemon is detached into its own session and never awaited: bootgate
//! keeps no handle to it, does not monitor it, and a failure to start it is
//! only logged. Nothing later in the boot depends on it being up.

use bootgate_shared::errors::{BootError, BootResult};
use bootgate_shared::AuxiliarySpec;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};

/// Detached service configuration.
#[derive(Debug, Clone)]
pub(crate) struct AuxiliaryService {
    pub program: String,
    pub args: Vec<String>,
    /// Pause after a successful spawn, e.g. to let the daemon bind its port
    pub grace: Duration,
}

impl AuxiliaryService {
    /// Build from a plan entry, using `default_grace` when the entry has none.
    pub fn from_spec(spec: AuxiliarySpec, default_grace: Duration) -> Self {
        let mut command = spec.command.into_iter();
        Self {
            program: command.next().unwrap_or_default(),
            args: command.collect(),
            grace: spec.grace.unwrap_or(default_grace),
        }
    }

    pub fn to_spec(&self) -> AuxiliarySpec {
        let mut command = Vec::with_capacity(self.args.len() + 1);
        command.push(self.program.clone());
        command.extend(self.args.iter().cloned());
        AuxiliarySpec {
            command,
            grace: Some(self.grace),
        }
    }
}

/// Start the service, then wait out its grace period.
///
/// Never fails: start errors are logged and the boot continues.
pub(crate) async fn launch(service: &AuxiliaryService) {
    match spawn_detached(service) {
        Ok(pid) => {
            info!(program = %service.program, pid, "🛠️ Auxiliary service started");
            if !service.grace.is_zero() {
                tokio::time::sleep(service.grace).await;
            }
        }
        Err(e) => {
            warn!("⚠️ {}; continuing without it", e);
        }
    }
}

/// Spawn `service` in a new session and forget about it.
///
/// Returns the child's PID.
pub(crate) fn spawn_detached(service: &AuxiliaryService) -> BootResult<u32> {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new(&service.program);
    cmd.args(&service.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // SAFETY: setsid() is async-signal-safe and touches no parent state.
    unsafe {
        cmd.pre_exec(|| {
            // Own session: terminal signals aimed at bootgate do not reach it
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }

    let child = cmd.spawn().map_err(|source| BootError::AuxiliaryStart {
        program: service.program.clone(),
        source,
    })?;

    // Dropping `Child` neither waits for nor kills the process.
    Ok(child.id())
}
