//! Boot configuration.
//!
//! `BootArgs` is the only place that looks at the process environment (through
//! clap's `env` fallbacks). It is resolved once into an immutable
//! [`BootConfig`] that every component receives explicitly.

use crate::auxiliary::AuxiliaryService;
use crate::pipeline::InitTask;
use bootgate_shared::constants::{auxiliary, dependency, probe, server, tasks, PLAN_ENV};
use bootgate_shared::duration::{format_duration, parse_duration};
use bootgate_shared::errors::{BootError, BootResult};
use bootgate_shared::{AuxiliarySpec, BootPlan, Endpoint, FailurePolicy, ProbeOutcomePolicy};
use clap::builder::FalseyValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// bootgate - container boot orchestrator
///
/// Starts an optional auxiliary service, waits for the database to accept
/// TCP connections, runs init tasks, then replaces itself with COMMAND.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bootgate - container boot orchestrator",
    args_override_self = true
)]
pub(crate) struct BootArgs {
    /// Dependency host to probe
    #[arg(long, env = dependency::HOST_ENV, default_value = dependency::DEFAULT_HOST)]
    pub host: String,

    /// Dependency port to probe
    #[arg(long, env = dependency::PORT_ENV, default_value_t = dependency::DEFAULT_PORT)]
    pub port: u16,

    /// Dependency as HOST:PORT (overrides --host/--port)
    #[arg(long, env = dependency::ENDPOINT_ENV)]
    pub dependency: Option<Endpoint>,

    /// Total time to wait for the dependency (e.g. 60s, 2m)
    #[arg(long, env = probe::TIMEOUT_ENV, default_value = probe::DEFAULT_TIMEOUT, value_parser = parse_duration)]
    pub probe_timeout: Duration,

    /// Delay between probe attempts
    #[arg(long, env = probe::INTERVAL_ENV, default_value = probe::DEFAULT_INTERVAL, value_parser = parse_duration)]
    pub probe_interval: Duration,

    /// Limit for a single connect attempt (defaults to the probe interval)
    #[arg(long, env = probe::CONNECT_TIMEOUT_ENV, value_parser = parse_duration)]
    pub connect_timeout: Option<Duration>,

    /// What to do when the dependency never became reachable: fail or proceed
    #[arg(long, env = probe::ON_UNREACHABLE_ENV, default_value = "fail")]
    pub on_unreachable: ProbeOutcomePolicy,

    /// JSON boot plan overriding tasks, auxiliary service and/or command
    #[arg(long, env = PLAN_ENV)]
    pub plan: Option<PathBuf>,

    /// Python interpreter for the built-in Django tasks
    #[arg(long, env = tasks::PYTHON_ENV, default_value = tasks::DEFAULT_PYTHON)]
    pub python: String,

    /// Django management script
    #[arg(long, env = tasks::MANAGE_SCRIPT_ENV, default_value = tasks::DEFAULT_MANAGE_SCRIPT)]
    pub manage: String,

    /// Failure policy of the migrate task: fatal or warn
    #[arg(long, env = tasks::MIGRATE_ON_FAILURE_ENV, default_value = "fatal")]
    pub migrate_on_failure: FailurePolicy,

    /// Failure policy of the collectstatic task: fatal or warn
    #[arg(long, env = tasks::COLLECTSTATIC_ON_FAILURE_ENV, default_value = "warn")]
    pub collectstatic_on_failure: FailurePolicy,

    /// Do not run the migrate task
    #[arg(long, env = tasks::SKIP_MIGRATE_ENV, value_parser = FalseyValueParser::new())]
    pub skip_migrate: bool,

    /// Do not run the collectstatic task
    #[arg(long, env = tasks::SKIP_COLLECTSTATIC_ENV, value_parser = FalseyValueParser::new())]
    pub skip_collectstatic: bool,

    /// Auxiliary service command line, e.g. "/usr/sbin/sshd -D"
    ///
    /// Split on whitespace with no shell quoting. Use the plan file's
    /// `auxiliary.command` for arguments that contain spaces.
    #[arg(long, env = auxiliary::COMMAND_ENV)]
    pub aux: Option<String>,

    /// Delay after starting the auxiliary service
    #[arg(long, env = auxiliary::GRACE_ENV, default_value = auxiliary::DEFAULT_GRACE, value_parser = parse_duration)]
    pub aux_grace: Duration,

    /// Port the default server command binds
    #[arg(long, env = server::PORT_ENV, default_value_t = server::DEFAULT_PORT)]
    pub bind_port: u16,

    /// Worker count of the default server command
    #[arg(long, env = server::WORKERS_ENV, default_value_t = server::DEFAULT_WORKERS)]
    pub workers: u32,

    /// WSGI application for the default server command (e.g. app.wsgi)
    #[arg(long, env = server::WSGI_APP_ENV)]
    pub wsgi_app: Option<String>,

    /// Command to exec into once boot succeeds
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Readiness probe settings.
#[derive(Debug, Clone)]
pub(crate) struct ProbeSettings {
    pub timeout: Duration,
    pub interval: Duration,
    pub connect_timeout: Duration,
    pub on_unreachable: ProbeOutcomePolicy,
}

/// Resolved, immutable boot configuration.
#[derive(Debug, Clone)]
pub(crate) struct BootConfig {
    pub dependency: Endpoint,
    pub probe: ProbeSettings,
    pub tasks: Vec<InitTask>,
    pub auxiliary: Option<AuxiliaryService>,
    pub final_command: Vec<String>,
}

impl BootConfig {
    /// Resolve arguments (and the plan file they point to) into a config.
    pub fn from_args(args: BootArgs) -> BootResult<Self> {
        let plan = match &args.plan {
            Some(path) => BootPlan::load(path)?,
            None => BootPlan::default(),
        };
        Self::resolve(args, plan)
    }

    fn resolve(args: BootArgs, plan: BootPlan) -> BootResult<Self> {
        if args.probe_interval.is_zero() {
            return Err(BootError::Config(
                "probe interval must be greater than zero".to_string(),
            ));
        }
        let connect_timeout = args.connect_timeout.unwrap_or(args.probe_interval);
        if connect_timeout.is_zero() {
            return Err(BootError::Config(
                "connect timeout must be greater than zero".to_string(),
            ));
        }

        let dependency = args
            .dependency
            .clone()
            .unwrap_or_else(|| Endpoint::new(args.host.clone(), args.port));

        let tasks = match plan.tasks {
            Some(specs) => specs.into_iter().map(InitTask::from).collect(),
            None => default_tasks(&args),
        };

        let auxiliary = match plan.auxiliary {
            Some(spec) => Some(AuxiliaryService::from_spec(spec, args.aux_grace)),
            None => match args.aux.as_deref().map(str::trim) {
                Some(line) if !line.is_empty() => Some(AuxiliaryService::from_spec(
                    AuxiliarySpec {
                        command: line.split_whitespace().map(String::from).collect(),
                        grace: None,
                    },
                    args.aux_grace,
                )),
                _ => None,
            },
        };

        let final_command = resolve_final_command(&args, plan.command)?;

        Ok(Self {
            dependency,
            probe: ProbeSettings {
                timeout: args.probe_timeout,
                interval: args.probe_interval,
                connect_timeout,
                on_unreachable: args.on_unreachable,
            },
            tasks,
            auxiliary,
            final_command,
        })
    }

    /// The config expressed as a plan document, for diagnostics.
    pub fn to_plan(&self) -> BootPlan {
        BootPlan {
            tasks: Some(self.tasks.iter().map(InitTask::to_spec).collect()),
            auxiliary: self.auxiliary.as_ref().map(AuxiliaryService::to_spec),
            command: Some(self.final_command.clone()),
        }
    }

    /// Log what this boot is going to do.
    pub fn log_summary(&self) {
        tracing::info!(
            dependency = %self.dependency,
            timeout = %format_duration(self.probe.timeout),
            interval = %format_duration(self.probe.interval),
            on_unreachable = %self.probe.on_unreachable,
            tasks = self.tasks.len(),
            auxiliary = self.auxiliary.is_some(),
            "Boot configuration resolved"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(&self.to_plan()) {
                Ok(json) => tracing::debug!(plan = %json, "Resolved boot plan"),
                Err(e) => tracing::debug!("Failed to render boot plan: {}", e),
            }
        }
    }
}

/// Built-in Django tasks: migrate first, then collectstatic.
fn default_tasks(args: &BootArgs) -> Vec<InitTask> {
    let mut list = Vec::new();
    if !args.skip_migrate {
        list.push(InitTask::new(
            tasks::MIGRATE,
            vec![
                args.python.clone(),
                args.manage.clone(),
                "migrate".to_string(),
                "--noinput".to_string(),
            ],
            args.migrate_on_failure,
        ));
    }
    if !args.skip_collectstatic {
        list.push(InitTask::new(
            tasks::COLLECTSTATIC,
            vec![
                args.python.clone(),
                args.manage.clone(),
                "collectstatic".to_string(),
                "--noinput".to_string(),
            ],
            args.collectstatic_on_failure,
        ));
    }
    list
}

/// Trailing command line > plan command > gunicorn built from env.
fn resolve_final_command(args: &BootArgs, plan_command: Option<Vec<String>>) -> BootResult<Vec<String>> {
    if !args.command.is_empty() {
        if args.command[0].is_empty() {
            return Err(BootError::Config("final command has an empty program".to_string()));
        }
        return Ok(args.command.clone());
    }

    if let Some(command) = plan_command {
        return Ok(command);
    }

    match args.wsgi_app.as_deref().map(str::trim) {
        Some(app) if !app.is_empty() => Ok(vec![
            server::DEFAULT_PROGRAM.to_string(),
            "--bind".to_string(),
            format!("{}:{}", server::BIND_HOST, args.bind_port),
            "--workers".to_string(),
            args.workers.to_string(),
            app.to_string(),
        ]),
        _ => Err(BootError::Config(format!(
            "no final command: pass COMMAND, set \"command\" in the boot plan or set {}",
            server::WSGI_APP_ENV
        ))),
    }
}
