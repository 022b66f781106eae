//! Readiness probe.
//!
//! Blocks the boot until the dependency accepts a TCP connection or the
//! time budget runs out. A probe is a bare connect-and-close; no bytes are
//! exchanged.

use async_trait::async_trait;
use bootgate_shared::errors::{BootError, BootResult};
use bootgate_shared::Endpoint;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Opens (and immediately drops) a connection to an endpoint.
#[async_trait]
pub(crate) trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<()>;
}

/// Plain TCP connector with a per-attempt deadline.
pub(crate) struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<()> {
        let attempt = tokio::net::TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        match tokio::time::timeout(self.connect_timeout, attempt).await {
            // Dropping the stream closes the connection
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            )),
        }
    }
}

/// Successful probe summary.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProbeReport {
    pub attempts: u32,
    pub waited: Duration,
}

/// Poll `endpoint` until it accepts a connection.
///
/// Attempts are scheduled at `started + k * interval`, with the schedule
/// clamped so the final attempt starts exactly at `timeout`. Each attempt
/// must finish before the next scheduled one; the final attempt gets at most
/// half an interval. Every failed attempt before the final one logs one
/// "waiting" line. If the dependency never comes up the call returns
/// [`BootError::DependencyUnreachable`] within `[timeout, timeout + interval)`,
/// however long a single connect would hang.
pub(crate) async fn await_reachable(
    connector: &dyn Connector,
    endpoint: &Endpoint,
    timeout: Duration,
    interval: Duration,
) -> BootResult<ProbeReport> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut slot = started;
    let mut attempts: u32 = 0;

    info!(
        dependency = %endpoint,
        "🔌 Waiting up to {:?} for dependency to accept connections",
        timeout
    );

    loop {
        attempts += 1;
        let last = slot >= deadline;
        let next_slot = (slot + interval).min(deadline);
        let attempt_deadline = if last { slot + interval / 2 } else { next_slot };

        let err = match tokio::time::timeout_at(attempt_deadline, connector.connect(endpoint)).await
        {
            Ok(Ok(())) => {
                let waited = started.elapsed();
                info!(
                    dependency = %endpoint,
                    attempts,
                    "✅ Dependency reachable after {:?}",
                    waited
                );
                return Ok(ProbeReport { attempts, waited });
            }
            Ok(Err(e)) => e,
            Err(_) => io::Error::new(
                io::ErrorKind::TimedOut,
                "no answer before the next attempt was due",
            ),
        };

        let elapsed = started.elapsed();
        if last {
            return Err(BootError::DependencyUnreachable {
                endpoint: endpoint.to_string(),
                attempts,
                waited: elapsed,
            });
        }

        debug!(attempt = attempts, error = %err, "probe attempt failed");
        info!(
            dependency = %endpoint,
            attempt = attempts,
            "⏳ waiting for dependency ({:?} elapsed, {:?} budget)",
            elapsed,
            timeout
        );

        slot = next_slot;
        tokio::time::sleep_until(slot).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Refuses connections until `ready_after` has passed since creation.
    pub(crate) struct ClockConnector {
        start: Instant,
        ready_after: Option<Duration>,
        pub attempts: AtomicU32,
    }

    impl ClockConnector {
        pub fn never() -> Self {
            Self {
                start: Instant::now(),
                ready_after: None,
                attempts: AtomicU32::new(0),
            }
        }

        pub fn after(ready_after: Duration) -> Self {
            Self {
                ready_after: Some(ready_after),
                ..Self::never()
            }
        }
    }

    #[async_trait]
    impl Connector for ClockConnector {
        async fn connect(&self, _endpoint: &Endpoint) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.ready_after {
                Some(after) if self.start.elapsed() >= after => Ok(()),
                _ => Err(io::Error::from(io::ErrorKind::ConnectionRefused)),
            }
        }
    }

    /// Never answers within `hang`, like a host that drops SYNs.
    struct HangingConnector {
        hang: Option<Duration>,
        attempts: AtomicU32,
    }

    impl HangingConnector {
        fn forever() -> Self {
            Self {
                hang: None,
                attempts: AtomicU32::new(0),
            }
        }

        fn for_each_attempt(hang: Duration) -> Self {
            Self {
                hang: Some(hang),
                ..Self::forever()
            }
        }
    }

    #[async_trait]
    impl Connector for HangingConnector {
        async fn connect(&self, _endpoint: &Endpoint) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.hang {
                Some(hang) => tokio::time::sleep(hang).await,
                None => std::future::pending::<()>().await,
            }
            Err(io::Error::from(io::ErrorKind::TimedOut))
        }
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn count(&self, needle: &str) -> usize {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).matches(needle).count()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Route this thread's logs into a buffer until the guard drops.
    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    fn endpoint() -> Endpoint {
        Endpoint::new("db", 3306)
    }

    fn unreachable_parts(err: BootError) -> (u32, Duration) {
        match err {
            BootError::DependencyUnreachable {
                attempts, waited, ..
            } => (attempts, waited),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reachable_immediately() {
        let connector = ClockConnector::after(Duration::ZERO);
        let report = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(report.waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_30_interval_5() {
        let connector = ClockConnector::never();
        let started = Instant::now();

        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        // Failures at 0, 5, ..., 25 each log a waiting line; the attempt at
        // 30 ends the probe.
        match err {
            BootError::DependencyUnreachable {
                attempts, waited, ..
            } => {
                assert_eq!(attempts, 7);
                assert_eq!(waited, Duration::from_secs(30));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 7);
        assert!(started.elapsed() <= Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_30_5_logs_six_waiting_lines() {
        let (logs, _guard) = capture_logs();
        let connector = ClockConnector::never();

        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert_eq!(unreachable_parts(err).0, 7);
        assert_eq!(logs.count("waiting for dependency"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_host_stays_on_schedule() {
        let (logs, _guard) = capture_logs();
        let connector = HangingConnector::forever();
        let started = Instant::now();

        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        // Attempts at 0, 5, ..., 30; the one at 30 is cut after half an interval
        let (attempts, waited) = unreachable_parts(err);
        assert_eq!(attempts, 7);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 7);
        assert_eq!(waited, Duration::from_millis(32_500));
        assert!(started.elapsed() < Duration::from_secs(35));
        assert_eq!(logs.count("waiting for dependency"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_connect_does_not_stretch_the_budget() {
        // Connect attempts that take as long as the interval itself
        let connector = HangingConnector::for_each_attempt(Duration::from_secs(5));
        let started = Instant::now();

        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        let (attempts, _) = unreachable_parts(err);
        assert_eq!(attempts, 7);
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_tries_once() {
        let connector = ClockConnector::never();
        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::ZERO,
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 69);
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_sleep_is_clamped() {
        let connector = ClockConnector::never();
        let err = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(7),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            BootError::DependencyUnreachable {
                attempts, waited, ..
            } => {
                assert_eq!(attempts, 3); // 0s, 5s, 7s
                assert_eq!(waited, Duration::from_secs(7));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_becomes_reachable_mid_interval() {
        let connector = ClockConnector::after(Duration::from_secs(12));
        let report = await_reachable(
            &connector,
            &endpoint(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(report.attempts, 4); // 0, 5, 10 fail; 15 succeeds
        assert_eq!(report.waited, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_tcp_connector_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connector = TcpConnector::new(Duration::from_secs(1));

        connector
            .connect(&Endpoint::new("127.0.0.1", port))
            .await
            .unwrap();

        drop(listener);
        assert!(connector
            .connect(&Endpoint::new("127.0.0.1", port))
            .await
            .is_err());
    }

    fn paused_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_unreachable_returns_within_one_interval(
            timeout_ms in 0u64..120_000,
            interval_ms in 1u64..10_000,
        ) {
            let timeout = Duration::from_millis(timeout_ms);
            let interval = Duration::from_millis(interval_ms);

            let waited = paused_runtime().block_on(async {
                let connector = ClockConnector::never();
                let started = Instant::now();
                let result = await_reachable(&connector, &endpoint(), timeout, interval).await;
                prop_assert!(
                    matches!(result, Err(BootError::DependencyUnreachable { .. })),
                    "expected DependencyUnreachable, got {:?}",
                    result
                );
                Ok(started.elapsed())
            })?;

            prop_assert!(waited >= timeout);
            prop_assert!(waited < timeout + interval);
        }

        #[test]
        fn prop_silent_host_returns_within_one_interval(
            timeout_ms in 0u64..120_000,
            // Half of 1ms rounds up to a full tick in tokio's timer wheel
            interval_ms in 2u64..10_000,
        ) {
            let timeout = Duration::from_millis(timeout_ms);
            let interval = Duration::from_millis(interval_ms);

            let waited = paused_runtime().block_on(async {
                let connector = HangingConnector::forever();
                let started = Instant::now();
                let result = await_reachable(&connector, &endpoint(), timeout, interval).await;
                prop_assert!(result.is_err());
                Ok(started.elapsed())
            })?;

            prop_assert!(waited >= timeout);
            prop_assert!(waited < timeout + interval);
        }

        #[test]
        fn prop_reachable_detected_within_one_interval(
            timeout_ms in 1u64..120_000,
            interval_ms in 1u64..10_000,
            ready_permille in 0u64..1000,
        ) {
            let timeout = Duration::from_millis(timeout_ms);
            let interval = Duration::from_millis(interval_ms);
            let ready_at = Duration::from_millis(timeout_ms * ready_permille / 1000);

            let waited = paused_runtime().block_on(async {
                let connector = ClockConnector::after(ready_at);
                let started = Instant::now();
                let result = await_reachable(&connector, &endpoint(), timeout, interval).await;
                prop_assert!(result.is_ok());
                Ok(started.elapsed())
            })?;

            prop_assert!(waited >= ready_at);
            prop_assert!(waited <= ready_at + interval);
        }
    }
}
