//! Initialization pipeline.
//!
//! Runs one-time setup tasks (schema migration, static asset publication)
//! strictly in declared order. Each task carries its own failure policy:
//!
//! - `fatal`: stop here; later tasks and the handoff never run
//! - `warn`: log, record in the report, continue with the next task
//!
//! Tasks are never retried or reordered. Idempotency is the task's own
//! business (e.g. Django only applies migrations that are not applied yet).

mod runner;

pub(crate) use runner::{CommandRunner, FailureReason, TaskRunner};

use bootgate_shared::errors::{BootError, BootResult};
use bootgate_shared::{FailurePolicy, TaskSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// A single initialization step.
#[derive(Debug, Clone)]
pub(crate) struct InitTask {
    pub name: String,
    /// Program followed by its arguments
    pub command: Vec<String>,
    pub on_failure: FailurePolicy,
    pub env: BTreeMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl InitTask {
    pub fn new(name: impl Into<String>, command: Vec<String>, on_failure: FailurePolicy) -> Self {
        Self {
            name: name.into(),
            command,
            on_failure,
            env: BTreeMap::new(),
            workdir: None,
        }
    }

    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    pub fn to_spec(&self) -> TaskSpec {
        TaskSpec {
            name: self.name.clone(),
            command: self.command.clone(),
            on_failure: self.on_failure,
            env: self.env.clone(),
            workdir: self.workdir.clone(),
        }
    }
}

impl From<TaskSpec> for InitTask {
    fn from(spec: TaskSpec) -> Self {
        Self {
            name: spec.name,
            command: spec.command,
            on_failure: spec.on_failure,
            env: spec.env,
            workdir: spec.workdir,
        }
    }
}

/// A `warn` task that failed and was skipped over.
#[derive(Debug)]
pub(crate) struct WarnTaskFailure {
    pub task: String,
    pub reason: FailureReason,
}

/// Result of a pipeline run that did not hit a fatal failure.
#[derive(Debug, Default)]
pub(crate) struct PipelineReport {
    /// Tasks that succeeded, in execution order
    pub completed: Vec<String>,
    /// Tasks that failed under the `warn` policy
    pub warnings: Vec<WarnTaskFailure>,
}

/// Run `tasks` in order with `runner`.
///
/// Returns [`BootError::FatalTask`] on the first failing `fatal` task.
pub(crate) async fn run_tasks(
    runner: &dyn TaskRunner,
    tasks: &[InitTask],
) -> BootResult<PipelineReport> {
    let mut report = PipelineReport::default();

    for (index, task) in tasks.iter().enumerate() {
        info!(
            task = %task.name,
            step = index + 1,
            total = tasks.len(),
            on_failure = %task.on_failure,
            "▶ Running init task: {}",
            task.command.join(" ")
        );
        let started = Instant::now();

        match runner.run(task).await {
            Ok(()) => {
                info!(
                    task = %task.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "✅ Init task succeeded"
                );
                report.completed.push(task.name.clone());
            }
            Err(reason) => match task.on_failure {
                FailurePolicy::Fatal => {
                    error!(task = %task.name, "❌ Init task failed ({}), aborting boot", reason);
                    return Err(BootError::FatalTask {
                        task: task.name.clone(),
                        reason: reason.to_string(),
                    });
                }
                FailurePolicy::Warn => {
                    warn!(task = %task.name, "⚠️ Init task failed ({}), continuing", reason);
                    report.warnings.push(WarnTaskFailure {
                        task: task.name.clone(),
                        reason,
                    });
                }
            },
        }
    }

    info!(
        completed = report.completed.len(),
        warnings = report.warnings.len(),
        "Init pipeline finished"
    );
    Ok(report)
}
