//! Entry point for bootgate, the container boot orchestrator.
//!
//! Runs as the container's PID 1: optional auxiliary service, readiness gate
//! on the database, init tasks, then `execvp` into the server.

#[cfg(not(unix))]
compile_error!("bootgate relies on execvp and setsid; build for a Unix target");

mod auxiliary;
mod boot;
mod config;
mod handoff;
mod pipeline;
mod probe;

use bootgate_shared::errors::BootResult;
use clap::Parser;
use config::{BootArgs, BootConfig};
use handoff::ExecHandoff;
use pipeline::CommandRunner;
use probe::TcpConnector;
use std::convert::Infallible;
use std::io::IsTerminal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Set panic hook to ensure we see panics
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("[PANIC] bootgate panicked: {}", panic_info);
        std::process::exit(1);
    }));

    // Initialize tracing subscriber - respects RUST_LOG env var
    // Default to "info" so container logs show every boot phase
    if let Err(e) = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
    {
        eprintln!("[ERROR] Failed to initialize tracing: {}", e);
        // Continue anyway - logging failure shouldn't stop the boot
    }

    let args = BootArgs::parse();

    let err = match run(args).await {
        Ok(never) => match never {},
        Err(e) => e,
    };

    error!(step = err.step(), "❌ Boot failed: {}", err);
    eprintln!("bootgate: {} step failed: {}", err.step(), err);
    std::process::exit(err.exit_code());
}

async fn run(args: BootArgs) -> BootResult<Infallible> {
    info!("🚀 bootgate starting (pid {})", std::process::id());

    let config = BootConfig::from_args(args)?;
    config.log_summary();

    let connector = TcpConnector::new(config.probe.connect_timeout);
    boot::run(&config, &connector, &CommandRunner, &ExecHandoff).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_structure() {
        use clap::CommandFactory;
        BootArgs::command().debug_assert();
    }
}
