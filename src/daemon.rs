//! Background poll loop.
//!
//! The loop sleeps on a fixed-rate timer, then runs one engine cycle in its own task
//! so that a panic inside a cycle is logged instead of ending the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::{format_interval, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SHUTDOWN_GRACE_SECS};
use crate::domain::Lifecycle;
use crate::engine::Engine;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub poll_interval: Duration,
    /// How long `stop` waits for an in-flight cycle before aborting it.
    pub shutdown_grace: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }
}

/// Handle to a running poll loop.
pub struct PollerHandle {
    engine: Arc<Engine>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    grace: Duration,
}

impl PollerHandle {
    /// Signals the loop and waits for it, aborting after the grace period.
    pub async fn stop(self) {
        self.engine.set_lifecycle(Lifecycle::Stopping);
        let _ = self.shutdown.send(true);

        let abort = self.task.abort_handle();
        match tokio::time::timeout(self.grace, self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Poll loop ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Poll loop did not stop within {:?}, aborting in-flight check",
                    self.grace
                );
                abort.abort();
            }
        }

        self.engine.set_lifecycle(Lifecycle::Stopped);
        info!("Poller stopped");
    }
}

/// Aborts the in-flight cycle task when the loop itself is dropped or aborted.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawns the poll loop. The engine is expected to be initialized already.
pub fn spawn(engine: Arc<Engine>, config: DaemonConfig) -> PollerHandle {
    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(run(engine.clone(), config.poll_interval, rx));

    PollerHandle {
        engine,
        shutdown,
        task,
        grace: config.shutdown_grace,
    }
}

async fn run(engine: Arc<Engine>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(
        "Poller started (interval: {}, feeds: {})",
        format_interval(period.as_secs().max(1)),
        engine.feeds().len()
    );

    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let started = Utc::now();
        let cycle = {
            let engine = engine.clone();
            let rx = shutdown.clone();
            tokio::spawn(async move { engine.run_cycle(Some(&rx)).await })
        };
        let _abort_guard = AbortOnDrop(cycle.abort_handle());

        match cycle.await {
            Ok(report) => {
                let elapsed = Utc::now().signed_duration_since(started);
                info!(
                    checked = report.checked,
                    changed = report.changed.len(),
                    failed = report.failed.len(),
                    "Check complete ({:.1}s)",
                    elapsed.num_milliseconds() as f64 / 1000.0
                );
            }
            Err(e) if e.is_panic() => error!("Check panicked, continuing: {}", e),
            Err(e) => error!("Check task failed: {}", e),
        }
    }

    info!("Poller shutting down");
}

/// Resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{FeedDescriptor, Snapshot};
    use crate::engine::EngineSettings;
    use crate::store::memory::MemoryStateStore;
    use crate::store::PersistedState;
    use crate::testing::{RecordingTransport, ScriptedFetcher};

    fn engine(fetcher: Arc<ScriptedFetcher>, transport: Arc<RecordingTransport>) -> Arc<Engine> {
        let store = MemoryStateStore::with_state(PersistedState {
            destinations: Some(vec!["d1".into()]),
            ..PersistedState::default()
        });
        Arc::new(Engine::new(
            vec![FeedDescriptor::new("fb_Beta", "https://example.com/beta")],
            fetcher,
            transport,
            Arc::new(store),
            EngineSettings::default(),
        ))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_loop_notifies_change_and_stops() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher
            .push("fb_Beta", Ok(Snapshot::new("A", "u1")))
            .push("fb_Beta", Ok(Snapshot::new("B", "u2")));
        let transport = Arc::new(RecordingTransport::new());
        let engine = engine(fetcher.clone(), transport.clone());
        engine.initialize().await;

        let handle = spawn(
            engine.clone(),
            DaemonConfig {
                poll_interval: Duration::from_millis(20),
                shutdown_grace: Duration::from_secs(1),
            },
        );

        assert!(wait_until(|| transport.sent().len() == 1).await);
        assert!(wait_until(|| fetcher.calls() >= 4).await);
        assert_eq!(transport.sent().len(), 1);

        handle.stop().await;
        assert_eq!(engine.status().lifecycle, Lifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_stop_interrupts_sleep_promptly() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push("fb_Beta", Ok(Snapshot::new("A", "u1")));
        let engine = engine(fetcher.clone(), Arc::new(RecordingTransport::new()));
        engine.initialize().await;

        let handle = spawn(
            engine,
            DaemonConfig {
                poll_interval: Duration::from_secs(3600),
                shutdown_grace: Duration::from_secs(5),
            },
        );

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert!(stopped.is_ok());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_notification_for_fetch_finishing_after_stop() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher
            .push("fb_Beta", Ok(Snapshot::new("A", "u1")))
            .push("fb_Beta", Ok(Snapshot::new("B", "u2")));
        let transport = Arc::new(RecordingTransport::new());
        let engine = engine(fetcher.clone(), transport.clone());
        engine.initialize().await;
        fetcher.hang("fb_Beta", Duration::from_millis(300));

        let handle = spawn(
            engine.clone(),
            DaemonConfig {
                poll_interval: Duration::from_millis(10),
                shutdown_grace: Duration::from_secs(2),
            },
        );
        assert!(wait_until(|| fetcher.calls() >= 2).await);

        handle.stop().await;

        assert!(transport.sent().is_empty());
        assert_eq!(engine.versions().get("fb_Beta").map(|s| s.title.as_str()), Some("A"));
        assert_eq!(engine.status().lifecycle, Lifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_stop_aborts_hung_cycle_after_grace() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push("fb_Beta", Ok(Snapshot::new("A", "u1")));
        let engine = engine(fetcher.clone(), Arc::new(RecordingTransport::new()));
        engine.initialize().await;
        fetcher.hang("fb_Beta", Duration::from_secs(2));

        let handle = spawn(
            engine,
            DaemonConfig {
                poll_interval: Duration::from_millis(10),
                shutdown_grace: Duration::from_millis(100),
            },
        );
        assert!(wait_until(|| fetcher.calls() >= 2).await);

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert!(stopped.is_ok());
    }
}
