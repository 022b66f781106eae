//! Boot plan file format.
//!
//! A plan is an optional JSON document that replaces the built-in task list,
//! auxiliary service and/or final command. Sections left out fall back to the
//! command-line and environment defaults.
//!
//! ```json
//! {
//!   "tasks": [
//!     {"name": "migrate", "command": ["python", "manage.py", "migrate", "--noinput"], "on_failure": "fatal"},
//!     {"name": "collectstatic", "command": ["python", "manage.py", "collectstatic", "--noinput"], "on_failure": "warn"}
//!   ],
//!   "auxiliary": {"command": ["/usr/sbin/sshd"], "grace": "2s"},
//!   "command": ["gunicorn", "--bind", "0.0.0.0:8000", "app.wsgi"]
//! }
//! ```

use crate::errors::{BootError, BootResult};
use crate::policy::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One initialization task as written in a plan file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    pub name: String,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub on_failure: FailurePolicy,
    /// Extra environment for this task only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

/// Detached service started before the readiness gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuxiliarySpec {
    pub command: Vec<String>,
    #[serde(default, with = "crate::duration::serde_opt")]
    pub grace: Option<Duration>,
}

/// Parsed plan file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootPlan {
    #[serde(default)]
    pub tasks: Option<Vec<TaskSpec>>,
    #[serde(default)]
    pub auxiliary: Option<AuxiliarySpec>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl BootPlan {
    /// Parse and validate a plan from JSON text.
    pub fn from_json(text: &str) -> BootResult<Self> {
        let plan: BootPlan = serde_json::from_str(text)
            .map_err(|e| BootError::Config(format!("Invalid boot plan: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Read a plan file from disk.
    pub fn load(path: &Path) -> BootResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BootError::Config(format!(
                "Failed to read boot plan {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    fn validate(&self) -> BootResult<()> {
        if let Some(tasks) = &self.tasks {
            let mut seen = HashSet::new();
            for task in tasks {
                if task.name.trim().is_empty() {
                    return Err(BootError::Config("Task with empty name".to_string()));
                }
                if task.command.first().is_none_or(|p| p.is_empty()) {
                    return Err(BootError::Config(format!(
                        "Task '{}' has an empty command",
                        task.name
                    )));
                }
                if !seen.insert(task.name.as_str()) {
                    return Err(BootError::Config(format!(
                        "Duplicate task name '{}'",
                        task.name
                    )));
                }
            }
        }

        if let Some(aux) = &self.auxiliary {
            if aux.command.first().is_none_or(|p| p.is_empty()) {
                return Err(BootError::Config(
                    "Auxiliary service has an empty command".to_string(),
                ));
            }
        }

        if let Some(command) = &self.command {
            if command.first().is_none_or(|p| p.is_empty()) {
                return Err(BootError::Config("Plan command is empty".to_string()));
            }
        }

        Ok(())
    }
}
