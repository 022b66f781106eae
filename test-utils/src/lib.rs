//! Fixtures for bootgate integration tests.
//!
//! - [`Fixture`]: temp directory with executable shell scripts standing in
//!   for migrate/collectstatic/server, plus a journal recording which ran
//! - [`Listener`]: local TCP listener playing the database
//! - [`free_port`]: a port with nothing listening on it

use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Temp directory holding fake collaborator commands.
pub struct Fixture {
    dir: TempDir,
    journal: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let journal = dir.path().join("journal");
        fs::write(&journal, "").expect("Failed to create journal");
        Self { dir, journal }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `/bin/sh` script and return its path.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = fs::File::create(&path).expect("Failed to create script");
        writeln!(file, "#!/bin/sh").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        drop(file);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        path
    }

    /// Script that appends `name` to the journal and exits with `code`.
    pub fn task(&self, name: &str, code: i32) -> PathBuf {
        self.script(
            &format!("{}.sh", name),
            &format!(
                "echo {name} >> '{journal}'\nexit {code}\n",
                journal = self.journal.display()
            ),
        )
    }

    /// Stand-in for Django's `manage.py`, run as `sh manage.sh <command>`.
    ///
    /// Records the management command in the journal and exits with
    /// `$MIGRATE_EXIT` / `$COLLECTSTATIC_EXIT` (default 0).
    pub fn manage(&self) -> PathBuf {
        self.script(
            "manage.sh",
            &format!(
                "echo \"$1\" >> '{journal}'\n\
                 case \"$1\" in\n\
                 migrate) exit \"${{MIGRATE_EXIT:-0}}\" ;;\n\
                 collectstatic) exit \"${{COLLECTSTATIC_EXIT:-0}}\" ;;\n\
                 esac\n\
                 exit 2\n",
                journal = self.journal.display()
            ),
        )
    }

    /// Script that prints each argument as `[arg]` on its own line.
    pub fn echo_server(&self) -> PathBuf {
        self.script(
            "server.sh",
            "for arg in \"$@\"; do printf '[%s]\\n' \"$arg\"; done\n",
        )
    }

    /// Names recorded by [`Fixture::task`] scripts, in execution order.
    pub fn journal(&self) -> Vec<String> {
        fs::read_to_string(&self.journal)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    /// Write a plan file and return its path.
    pub fn plan(&self, json: &str) -> PathBuf {
        let path = self.dir.path().join("plan.json");
        fs::write(&path, json).expect("Failed to write plan");
        path
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// TCP listener accepting (and dropping) connections on a background thread.
pub struct Listener {
    addr: SocketAddr,
    peers: Arc<Mutex<Vec<SocketAddr>>>,
}

impl Listener {
    /// Listen on an ephemeral loopback port right away.
    pub fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().unwrap();
        let peers = Arc::new(Mutex::new(Vec::new()));
        Self::serve(listener, Arc::clone(&peers));
        Self { addr, peers }
    }

    /// Start listening on `port` only after `delay`.
    pub fn bind_after(port: u16, delay: Duration) -> Self {
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let peers = Arc::new(Mutex::new(Vec::new()));
        let serve_peers = Arc::clone(&peers);
        thread::spawn(move || {
            thread::sleep(delay);
            if let Ok(listener) = TcpListener::bind(addr) {
                Self::serve(listener, serve_peers);
            }
        });
        Self { addr, peers }
    }

    fn serve(listener: TcpListener, peers: Arc<Mutex<Vec<SocketAddr>>>) {
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                if let Ok(peer) = stream.peer_addr() {
                    peers.lock().push(peer);
                }
            }
        });
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.peers.lock().len()
    }
}

/// A loopback port nothing is listening on (at the time of the call).
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().unwrap().port()
}
