//! Process handoff.
//!
//! Replaces the bootgate process image with the final server command via
//! `execvp`. The server keeps bootgate's PID (normally 1), so the container
//! runtime's stop/reload signals reach it directly. There is no
//! fork-and-wait: on success nothing after the call runs.

use bootgate_shared::errors::{BootError, BootResult};
use std::convert::Infallible;
use std::ffi::CString;
use tracing::info;

/// Final step of the boot.
pub(crate) trait Handoff {
    /// `Infallible` for a real exec; tests capture the argv instead.
    type Output;

    fn hand_off(&self, argv: &[String]) -> BootResult<Self::Output>;
}

/// Handoff through `execvp`.
pub(crate) struct ExecHandoff;

impl Handoff for ExecHandoff {
    type Output = Infallible;

    fn hand_off(&self, argv: &[String]) -> BootResult<Infallible> {
        exec(argv)
    }
}

/// Convert the argv byte-for-byte into C strings.
fn to_cstrings(argv: &[String]) -> BootResult<Vec<CString>> {
    if argv.first().is_none_or(|p| p.is_empty()) {
        return Err(BootError::Config("final command is empty".to_string()));
    }

    argv.iter()
        .map(|arg| {
            CString::new(arg.as_bytes()).map_err(|_| {
                BootError::Config(format!("final command argument contains NUL: {:?}", arg))
            })
        })
        .collect()
}

/// Replace the current process with `argv`. Returns only on failure.
pub(crate) fn exec(argv: &[String]) -> BootResult<Infallible> {
    let cargs = to_cstrings(argv)?;

    info!(command = ?argv, "🚀 Handing off to final command");

    nix::unistd::execvp(&cargs[0], &cargs).map_err(|errno| BootError::Handoff {
        program: argv[0].clone(),
        source: std::io::Error::from(errno),
    })
}
