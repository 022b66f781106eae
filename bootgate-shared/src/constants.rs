//! Defaults and environment variable names.
//!
//! Every value here is a fallback used when neither a command-line flag nor
//! the matching environment variable is set.

/// Dependency (database) probe defaults
pub mod dependency {
    /// Environment variable holding the dependency host
    pub const HOST_ENV: &str = "MYSQL_DB_HOST";

    /// Environment variable holding the dependency port
    pub const PORT_ENV: &str = "MYSQL_DB_PORT";

    /// Environment variable holding `host:port`, overriding the two above
    pub const ENDPOINT_ENV: &str = "BOOT_DEPENDENCY";

    /// Host probed when nothing else is configured (compose service name)
    pub const DEFAULT_HOST: &str = "db";

    /// MySQL default port
    pub const DEFAULT_PORT: u16 = 3306;
}

/// Readiness probe timing
pub mod probe {
    /// Total time budget for readiness polling
    pub const DEFAULT_TIMEOUT: &str = "60s";

    /// Delay between two probe attempts
    pub const DEFAULT_INTERVAL: &str = "1s";

    pub const TIMEOUT_ENV: &str = "BOOT_PROBE_TIMEOUT";
    pub const INTERVAL_ENV: &str = "BOOT_PROBE_INTERVAL";
    pub const CONNECT_TIMEOUT_ENV: &str = "BOOT_CONNECT_TIMEOUT";
    pub const ON_UNREACHABLE_ENV: &str = "BOOT_ON_UNREACHABLE";
}

/// Built-in Django initialization tasks
pub mod tasks {
    pub const MIGRATE: &str = "migrate";
    pub const COLLECTSTATIC: &str = "collectstatic";

    pub const DEFAULT_PYTHON: &str = "python";
    pub const DEFAULT_MANAGE_SCRIPT: &str = "manage.py";

    pub const PYTHON_ENV: &str = "BOOT_PYTHON";
    pub const MANAGE_SCRIPT_ENV: &str = "BOOT_MANAGE_SCRIPT";
    pub const MIGRATE_ON_FAILURE_ENV: &str = "BOOT_MIGRATE_ON_FAILURE";
    pub const COLLECTSTATIC_ON_FAILURE_ENV: &str = "BOOT_COLLECTSTATIC_ON_FAILURE";
    pub const SKIP_MIGRATE_ENV: &str = "BOOT_SKIP_MIGRATE";
    pub const SKIP_COLLECTSTATIC_ENV: &str = "BOOT_SKIP_COLLECTSTATIC";
}

/// Auxiliary (diagnostic shell) service
pub mod auxiliary {
    /// Whitespace separated argv, e.g. `/usr/sbin/sshd -D`
    pub const COMMAND_ENV: &str = "BOOT_AUX_COMMAND";

    /// Delay after spawning the service before continuing
    pub const GRACE_ENV: &str = "BOOT_AUX_GRACE";

    pub const DEFAULT_GRACE: &str = "0s";
}

/// Final server command
pub mod server {
    pub const PORT_ENV: &str = "PORT";
    pub const WORKERS_ENV: &str = "WEB_CONCURRENCY";
    pub const WSGI_APP_ENV: &str = "BOOT_WSGI_APP";

    pub const DEFAULT_PORT: u16 = 8000;
    pub const DEFAULT_WORKERS: u32 = 3;

    /// Program launched when only a WSGI application is configured
    pub const DEFAULT_PROGRAM: &str = "gunicorn";

    /// Address the server binds inside the container
    pub const BIND_HOST: &str = "0.0.0.0";
}

/// Plan file location
pub const PLAN_ENV: &str = "BOOT_PLAN";

/// Process exit codes (sysexits.h values where one fits)
pub mod exit_code {
    /// EX_UNAVAILABLE
    pub const DEPENDENCY_UNREACHABLE: i32 = 69;
    /// EX_SOFTWARE
    pub const FATAL_TASK: i32 = 70;
    /// EX_IOERR
    pub const IO: i32 = 74;
    /// EX_CONFIG
    pub const CONFIG: i32 = 78;
    /// Shell convention for a command that exists but cannot run
    pub const HANDOFF_NOT_EXECUTABLE: i32 = 126;
    /// Shell convention for a command that was not found
    pub const HANDOFF_NOT_FOUND: i32 = 127;
    /// Added to the signal number when boot is interrupted
    pub const SIGNAL_BASE: i32 = 128;
}
