//! Fixed-period ticker with a single active run per job.
//!
//! Every fire spawns the job body. A fire that lands while the previous run is still going is
//! skipped with a warning. On shutdown the ticker stops firing and waits for the in-flight run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// One tick. Errors are the job's to log; nothing propagates out of a tick.
    async fn run_once(&self);
}

/// Atomic "a run is active" flag.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

/// Held for the duration of a run; releases the guard on drop, including on panic.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Fire `job` every `period` until `shutdown` is cancelled.
///
/// With `run_immediately` the first fire happens at once, otherwise after one period.
pub async fn run_every<J: Job>(
    job: Arc<J>,
    period: Duration,
    run_immediately: bool,
    shutdown: CancellationToken,
) {
    let name = job.name();
    let guard = RunGuard::new();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if !run_immediately {
        ticker.tick().await; // consume immediate first tick
    }

    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(permit) = guard.try_acquire() else {
            warn!(job = name, "Previous {name} run still in progress, overlap detected; skipping this fire");
            continue;
        };

        let job = Arc::clone(&job);
        in_flight = Some(tokio::spawn(async move {
            let _permit = permit;
            job.run_once().await;
        }));
    }

    info!(job = name, "Stopping {name} schedule");
    if let Some(handle) = in_flight {
        if !handle.is_finished() {
            info!(job = name, "Waiting for in-flight {name} run to finish");
        }
        if let Err(e) = handle.await {
            warn!(job = name, "{name} run ended abnormally: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[test]
    fn guard_admits_one_run_at_a_time() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    struct BlockingJob {
        started: AtomicUsize,
        finished: AtomicUsize,
        release: Notify,
    }

    #[async_trait]
    impl Job for BlockingJob {
        fn name(&self) -> &'static str {
            "blocking"
        }

        async fn run_once(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn overlapping_fires_are_skipped_and_shutdown_waits_for_run() {
        let job = Arc::new(BlockingJob {
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            release: Notify::new(),
        });
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_every(
            Arc::clone(&job),
            Duration::from_millis(10),
            true,
            shutdown.clone(),
        ));

        // Several periods elapse while the first run is blocked.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(job.started.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "shutdown must wait for the in-flight run");

        job.release.notify_one();
        handle.await.unwrap();
        assert_eq!(job.finished.load(Ordering::SeqCst), 1);
    }

    struct CountingJob(AtomicUsize);

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_once(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn delayed_start_skips_the_immediate_fire() {
        let job = Arc::new(CountingJob(AtomicUsize::new(0)));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_every(
            Arc::clone(&job),
            Duration::from_secs(3600),
            false,
            shutdown.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(job.0.load(Ordering::SeqCst), 0);
    }
}
