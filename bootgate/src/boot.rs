//! Boot sequence.
//!
//! ```text
//! Auxiliary (detached) ──→ Probe (gate) ──→ Pipeline (ordered) ──→ Handoff (exec)
//! ```
//!
//! Every step runs to completion before the next one starts. Until handoff
//! bootgate is PID 1, and the kernel drops SIGTERM/SIGINT for PID 1 unless a
//! handler is installed, so those signals are caught here and end the boot.

use crate::auxiliary;
use crate::config::BootConfig;
use crate::handoff::Handoff;
use crate::pipeline::{self, TaskRunner};
use crate::probe::{self, Connector};
use bootgate_shared::errors::{BootError, BootResult};
use bootgate_shared::ProbeOutcomePolicy;
use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

/// Run the whole boot and hand off.
///
/// With a real exec handoff this only returns on failure.
pub(crate) async fn run<H: Handoff>(
    config: &BootConfig,
    connector: &dyn Connector,
    runner: &dyn TaskRunner,
    handoff: &H,
) -> BootResult<H::Output> {
    let mut terminator = Terminator::install()?;

    tokio::select! {
        result = prepare(config, connector, runner) => result?,
        signo = terminator.recv() => {
            warn!(signal = signo, "🛑 Termination signal received before handoff, aborting boot");
            return Err(BootError::Interrupted(signo));
        }
    }

    handoff.hand_off(&config.final_command)
}

/// Everything before the handoff.
async fn prepare(
    config: &BootConfig,
    connector: &dyn Connector,
    runner: &dyn TaskRunner,
) -> BootResult<()> {
    if let Some(service) = &config.auxiliary {
        info!(program = %service.program, "Phase 1/3: starting auxiliary service");
        auxiliary::launch(service).await;
    }

    info!(dependency = %config.dependency, "Phase 2/3: readiness gate");
    match probe::await_reachable(
        connector,
        &config.dependency,
        config.probe.timeout,
        config.probe.interval,
    )
    .await
    {
        Ok(report) => {
            debug!(attempts = report.attempts, waited = ?report.waited, "Readiness gate passed");
        }
        Err(e @ BootError::DependencyUnreachable { .. }) => match config.probe.on_unreachable {
            ProbeOutcomePolicy::Fail => return Err(e),
            ProbeOutcomePolicy::Proceed => {
                warn!("⚠️ {}; proceeding anyway", e);
            }
        },
        Err(e) => return Err(e),
    }

    info!(tasks = config.tasks.len(), "Phase 3/3: init tasks");
    let report = pipeline::run_tasks(runner, &config.tasks).await?;
    for failure in &report.warnings {
        warn!(task = %failure.task, "Boot continues despite failed task ({})", failure.reason);
    }

    Ok(())
}

/// SIGTERM/SIGINT listener, registered before any boot step runs.
struct Terminator {
    term: tokio::signal::unix::Signal,
    int: tokio::signal::unix::Signal,
}

impl Terminator {
    fn install() -> BootResult<Self> {
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next signal and return its number.
    async fn recv(&mut self) -> i32 {
        tokio::select! {
            _ = self.term.recv() => Signal::SIGTERM as i32,
            _ = self.int.recv() => Signal::SIGINT as i32,
        }
    }
}
