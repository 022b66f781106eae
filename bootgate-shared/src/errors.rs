//! Error taxonomy for the boot sequence.
//!
//! Variants map to the step that failed. Only some of them end the boot:
//! - [`BootError::DependencyUnreachable`], [`BootError::FatalTask`],
//!   [`BootError::Handoff`], [`BootError::Config`] and
//!   [`BootError::Interrupted`] stop the process with [`BootError::exit_code`]
//! - [`BootError::AuxiliaryStart`] is logged and swallowed by the launcher

use crate::constants::exit_code;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result alias used across bootgate.
pub type BootResult<T> = Result<T, BootError>;

#[derive(Debug, Error)]
pub enum BootError {
    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(String),

    /// The readiness probe ran out of time.
    #[error("dependency {endpoint} unreachable after {attempts} attempts ({waited:?})")]
    DependencyUnreachable {
        endpoint: String,
        attempts: u32,
        waited: Duration,
    },

    /// A task with a fatal failure policy did not succeed.
    #[error("init task '{task}' failed: {reason}")]
    FatalTask { task: String, reason: String },

    /// The auxiliary service could not be spawned.
    #[error("auxiliary service '{program}' failed to start: {source}")]
    AuxiliaryStart {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Replacing the process image with the final command failed.
    #[error("handoff to '{program}' failed: {source}")]
    Handoff {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A termination signal arrived before handoff.
    #[error("boot interrupted by signal {0}")]
    Interrupted(i32),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

impl BootError {
    /// Short name of the boot step this error belongs to.
    pub fn step(&self) -> &'static str {
        match self {
            BootError::Config(_) => "config",
            BootError::DependencyUnreachable { .. } => "probe",
            BootError::FatalTask { .. } => "pipeline",
            BootError::AuxiliaryStart { .. } => "auxiliary",
            BootError::Handoff { .. } => "handoff",
            BootError::Interrupted(_) => "signal",
            BootError::Io(_) => "io",
        }
    }

    /// Process exit status for this error.
    ///
    /// Never zero: exit code 0 only comes from the handed-off server.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootError::Config(_) => exit_code::CONFIG,
            BootError::DependencyUnreachable { .. } => exit_code::DEPENDENCY_UNREACHABLE,
            BootError::FatalTask { .. } => exit_code::FATAL_TASK,
            BootError::Handoff { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                exit_code::HANDOFF_NOT_FOUND
            }
            BootError::Handoff { .. } => exit_code::HANDOFF_NOT_EXECUTABLE,
            BootError::Interrupted(signo) => exit_code::SIGNAL_BASE + signo,
            BootError::AuxiliaryStart { .. } | BootError::Io(_) => exit_code::IO,
        }
    }
}
