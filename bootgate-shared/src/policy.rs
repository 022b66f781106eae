//! Failure policies.
//!
//! Deployments disagree on which failures should stop a boot, so both the
//! probe outcome and every init task carry an explicit policy.

use serde::{Deserialize, Serialize};

/// What a failed init task does to the rest of the boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the boot; no later task runs and no handoff happens.
    Fatal,
    /// Log the failure and continue with the next task.
    Warn,
}

/// What the boot does when the dependency never became reachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcomePolicy {
    /// Exit non-zero.
    Fail,
    /// Warn and continue; later steps surface the real error.
    Proceed,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "warn" | "ignore" => Ok(Self::Warn),
            other => Err(format!(
                "invalid failure policy '{}': expected fatal or warn",
                other
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

impl std::str::FromStr for ProbeOutcomePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "exit" => Ok(Self::Fail),
            "proceed" | "warn" => Ok(Self::Proceed),
            other => Err(format!(
                "invalid probe outcome policy '{}': expected fail or proceed",
                other
            )),
        }
    }
}

impl std::fmt::Display for ProbeOutcomePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Proceed => write!(f, "proceed"),
        }
    }
}
