#![allow(dead_code)]

use assert_cmd::Command;
use bootgate_test_utils::Fixture;
use std::time::Duration;

pub const BIN: &str = env!("CARGO_BIN_EXE_bootgate");

/// bootgate with a clean environment, running inside the fixture directory.
///
/// The environment is cleared so MYSQL_DB_*, PORT and BOOT_* from the
/// developer's shell cannot leak into a test.
pub fn bootgate(fixture: &Fixture) -> Command {
    let mut cmd = Command::new(BIN);
    // You can override this with .timeout(Duration::from_secs(N))
    cmd.timeout(Duration::from_secs(60));
    cmd.env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("RUST_LOG", "info")
        .current_dir(fixture.path());
    cmd
}

/// bootgate probing `port` on loopback with fast probe timing and the
/// fixture's fake `manage.py`.
pub fn bootgate_with_dependency(fixture: &Fixture, port: u16) -> Command {
    let manage = fixture.manage();
    let mut cmd = bootgate(fixture);
    cmd.args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["--probe-timeout", "2s", "--probe-interval", "1s"])
        .args(["--python", "sh", "--manage"])
        .arg(manage);
    cmd
}

pub fn count(haystack: &[u8], needle: &str) -> usize {
    String::from_utf8_lossy(haystack).matches(needle).count()
}
