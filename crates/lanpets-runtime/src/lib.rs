//! The collector scheduler: a per-worker rate limiter, a `Worker` trait
//! every protocol collector implements, and a `Supervisor` that runs them
//! to completion or shared cancellation.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A collector-boundary error. `Transient` covers a single bad tick (a
/// device didn't answer, a router login timed out) and never stops the
/// worker; `Fatal` means the worker's own state is no longer trustworthy
/// and the whole process should wind down.
#[derive(Debug, Clone)]
pub enum CollectorError {
    Transient(String),
    Fatal(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::Transient(msg) => write!(f, "transient: {msg}"),
            CollectorError::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

/// Fires `true` at most once per `update_period`, analogous to
/// `RateLimiter.get_ready()` — monotonic-clock gated so it's immune to
/// wall-clock adjustments.
pub struct Ticker {
    update_period: Duration,
    last_fire: tokio::time::Instant,
}

impl Ticker {
    pub fn new(update_period: Duration) -> Self {
        Self {
            update_period,
            // `Instant` has no negative-infinity analogue; back-date by the
            // period itself so the first `ready()` call always fires.
            last_fire: tokio::time::Instant::now() - update_period,
        }
    }

    /// Side-effecting: advances the internal deadline when it returns
    /// `true`, exactly like the Python `get_ready`.
    pub fn ready(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        if now.saturating_duration_since(self.last_fire) >= self.update_period {
            self.last_fire = now;
            true
        } else {
            false
        }
    }
}

/// One tick of a collector. `check` is for non-blocking, every-loop
/// post-processing independent of the rate limiter (only the NMAP bridge
/// uses it, to notice a background scan has finished); the default no-op
/// covers every other worker.
#[async_trait::async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    async fn update(&self) -> Result<(), CollectorError>;

    async fn check(&self) -> Result<(), CollectorError> {
        Ok(())
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs a set of workers to completion: each gets its own task, a
/// staggered 1-2s start delay so they don't all hit the network in the
/// same instant, and a shared cancellation token. A worker's `Fatal`
/// error (or panic) cancels every other worker; `Transient` errors are
/// logged and the loop continues.
pub struct Supervisor {
    token: CancellationToken,
}

impl Supervisor {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs every worker until cancellation, then returns once all worker
    /// tasks have unwound. Also cancels on `SIGINT`.
    pub async fn run(&self, workers: Vec<(Arc<dyn Worker>, Duration)>) {
        let mut tasks = JoinSet::new();
        for (worker, period) in workers {
            let token = self.token.clone();
            tasks.spawn(run_worker(worker, period, token));
        }

        let sigint_token = self.token.clone();
        tasks.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received SIGINT, stopping collectors");
            }
            sigint_token.cancel();
        });

        while let Some(result) = tasks.join_next().await {
            if let Err(join_error) = result {
                tracing::error!(error = %join_error, "collector task panicked");
                self.token.cancel();
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(worker: Arc<dyn Worker>, period: Duration, token: CancellationToken) {
    let stagger = Duration::from_millis(rand::thread_rng().gen_range(1_000..=2_000));
    tokio::select! {
        _ = tokio::time::sleep(stagger) => {}
        _ = token.cancelled() => return,
    }

    let mut ticker = Ticker::new(period);
    loop {
        if token.is_cancelled() {
            return;
        }

        if let Err(error) = worker.check().await {
            match error {
                CollectorError::Transient(msg) => {
                    tracing::warn!(worker = worker.name(), error = %msg, "transient check error");
                }
                CollectorError::Fatal(msg) => {
                    tracing::error!(worker = worker.name(), error = %msg, "fatal check error, stopping all collectors");
                    token.cancel();
                    return;
                }
            }
        }

        if ticker.ready() {
            if let Err(error) = worker.update().await {
                match error {
                    CollectorError::Transient(msg) => {
                        tracing::warn!(worker = worker.name(), error = %msg, "transient update error");
                    }
                    CollectorError::Fatal(msg) => {
                        tracing::error!(worker = worker.name(), error = %msg, "fatal update error, stopping all collectors");
                        token.cancel();
                        return;
                    }
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = token.cancelled() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct CountingWorker {
        count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &str {
            "counting"
        }

        async fn update(&self) -> Result<(), CollectorError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct DyingWorker;

    #[async_trait::async_trait]
    impl Worker for DyingWorker {
        fn name(&self) -> &str {
            "dying"
        }

        async fn update(&self) -> Result<(), CollectorError> {
            Err(CollectorError::Fatal("boom".into()))
        }
    }

    #[test]
    fn ticker_fires_once_per_period_then_waits() {
        let mut ticker = Ticker::new(StdDuration::from_secs(3600));
        assert!(ticker.ready());
        assert!(!ticker.ready());
    }

    /// P9: cancellation propagates and the supervisor returns once every
    /// worker task has observed it.
    #[tokio::test(start_paused = true)]
    async fn fatal_error_cancels_all_workers() {
        let count = Arc::new(AtomicUsize::new(0));
        let supervisor = Supervisor::new();
        let ok_worker: Arc<dyn Worker> = Arc::new(CountingWorker { count: count.clone() });
        let dying_worker: Arc<dyn Worker> = Arc::new(DyingWorker);

        let run = supervisor.run(vec![
            (ok_worker, StdDuration::from_millis(10)),
            (dying_worker, StdDuration::from_millis(10)),
        ]);

        tokio::select! {
            _ = run => {}
            _ = tokio::time::sleep(StdDuration::from_secs(30)) => panic!("supervisor never converged"),
        }
        assert!(supervisor.cancellation_token().is_cancelled());
    }
}
