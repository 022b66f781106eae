//! bootgate shared types
//!
//! This crate contains the error taxonomy, defaults, endpoint parsing and
//! boot plan format used by the bootgate binary and its test fixtures.

pub mod constants;
pub mod duration;
pub mod endpoint;
pub mod errors;
pub mod plan;
pub mod policy;

pub use endpoint::Endpoint;
pub use errors::{BootError, BootResult};
pub use plan::{AuxiliarySpec, BootPlan, TaskSpec};
pub use policy::{FailurePolicy, ProbeOutcomePolicy};
