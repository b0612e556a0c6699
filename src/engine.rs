//! The poll–diff–notify engine.
//!
//! ```text
//! fetch → decide (detector) → notify (fan-out) → record → persist
//! ```
//!
//! One [`Engine`] owns the version record and the destination registry. Cycles
//! (scheduled or manual) are serialized by an async mutex; short reads and writes of
//! shared state go through a blocking mutex that is never held across an await.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::app::{FetchError, McUpdateError, PersistenceError, Result};
use crate::detector::{decide, Decision};
use crate::domain::{FeedDescriptor, Lifecycle, PollStatus, Snapshot, VersionRecord};
use crate::fetcher::http_fetcher::DEFAULT_TIMEOUT_SECS;
use crate::fetcher::Fetcher;
use crate::notifier::{format_message, FanoutReport, Notifier, Transport, DEFAULT_BANNER};
use crate::registry::{AddOutcome, DestinationRegistry, RemoveOutcome};
use crate::store::{load_or_default, PersistedState, StateStore};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub banner: String,
    /// Upper bound on a single fetch, whatever the fetcher does internally.
    pub fetch_deadline: Duration,
    /// Registry contents when nothing has been persisted yet.
    pub default_destinations: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            fetch_deadline: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_destinations: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub checked: usize,
    pub changed: Vec<String>,
    pub seeded: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
    /// Shutdown was requested before every feed was checked.
    pub cancelled: bool,
}

/// A fresh fetch result, rendered by `show-latest`.
#[derive(Debug, Clone)]
pub struct LatestEntry {
    pub feed: FeedDescriptor,
    pub result: std::result::Result<Snapshot, FetchError>,
}

#[derive(Debug, Default)]
struct EngineState {
    versions: VersionRecord,
    destinations: DestinationRegistry,
    last_errors: BTreeMap<String, String>,
    lifecycle: Lifecycle,
}

pub struct Engine {
    feeds: Vec<FeedDescriptor>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    notifier: Notifier,
    store: Arc<dyn StateStore + Send + Sync>,
    settings: EngineSettings,
    state: Mutex<EngineState>,
    cycle: tokio::sync::Mutex<()>,
}

impl Engine {
    pub fn new(
        feeds: Vec<FeedDescriptor>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        transport: Arc<dyn Transport + Send + Sync>,
        store: Arc<dyn StateStore + Send + Sync>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            feeds,
            fetcher,
            notifier: Notifier::new(transport),
            store,
            settings,
            state: Mutex::new(EngineState::default()),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn feeds(&self) -> &[FeedDescriptor] {
        &self.feeds
    }

    pub fn find_feed(&self, key: &str) -> Option<&FeedDescriptor> {
        self.feeds.iter().find(|feed| feed.matches(key))
    }

    /// Replaces in-memory state with what is persisted. Never fails.
    pub fn load(&self) {
        let persisted = load_or_default(self.store.as_ref());

        let destinations = match persisted.destinations {
            Some(ids) => DestinationRegistry::from_ids(ids),
            None => DestinationRegistry::from_ids(self.settings.default_destinations.iter().cloned()),
        };

        let mut state = self.state();
        state.versions = persisted.versions;
        state.destinations = destinations;
        info!(
            feeds = state.versions.len(),
            destinations = state.destinations.len(),
            "Loaded state"
        );
    }

    /// Loads state and records every feed's current snapshot without notifying.
    pub async fn initialize(&self) -> CycleReport {
        self.set_lifecycle(Lifecycle::Initializing);
        self.load();

        let _cycle = self.cycle.lock().await;
        let mut report = CycleReport::default();

        for feed in &self.feeds {
            report.checked += 1;
            match self.fetch(feed).await {
                Ok(snapshot) => {
                    info!(feed = %feed.name, title = %snapshot.display_title(), "Seeded baseline");
                    let mut state = self.state();
                    state.last_errors.remove(&feed.name);
                    state.versions.insert(feed.name.clone(), snapshot);
                    report.seeded.push(feed.name.clone());
                }
                Err(e) => {
                    self.record_failure(feed, &e);
                    report.failed.push((feed.name.clone(), e));
                }
            }
        }

        {
            let state = self.state();
            self.persist(&state);
        }

        self.set_lifecycle(Lifecycle::Running);
        report
    }

    /// Runs one check over every feed in configured order.
    ///
    /// `shutdown` is consulted between feeds; a set flag ends the cycle early.
    pub async fn run_cycle(&self, shutdown: Option<&watch::Receiver<bool>>) -> CycleReport {
        let _cycle = self.cycle.lock().await;
        let mut report = CycleReport::default();

        for feed in &self.feeds {
            if stop_requested(shutdown) {
                debug!("Shutdown requested, ending cycle early");
                report.cancelled = true;
                break;
            }
            report.checked += 1;

            let fetched = self.fetch(feed).await;
            // Nothing is sent or recorded once stop has been requested.
            if stop_requested(shutdown) {
                debug!(feed = %feed.name, "Shutdown requested during fetch, discarding result");
                report.cancelled = true;
                break;
            }

            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    self.record_failure(feed, &e);
                    report.failed.push((feed.name.clone(), e));
                    continue;
                }
            };

            let previous = {
                let mut state = self.state();
                state.last_errors.remove(&feed.name);
                state.versions.get(&feed.name).cloned()
            };

            match decide(previous.as_ref(), &snapshot) {
                Decision::Unchanged => {
                    debug!(feed = %feed.name, "No change");
                }
                Decision::Seed => {
                    info!(feed = %feed.name, title = %snapshot.display_title(), "No baseline yet, recording without notifying");
                    self.record(feed, snapshot);
                    report.seeded.push(feed.name.clone());
                }
                Decision::Changed => {
                    info!(feed = %feed.name, title = %snapshot.display_title(), "New article detected");
                    let message = format_message(&self.settings.banner, feed, &snapshot);
                    let destinations = self.list_destinations();
                    // Recorded regardless of delivery outcome.
                    self.notifier.notify(&destinations, &message).await;
                    self.record(feed, snapshot);
                    report.changed.push(feed.name.clone());
                }
            }
        }

        report
    }

    /// Out-of-band cycle; does not touch the poll timer.
    pub async fn manual_check(&self) -> CycleReport {
        self.run_cycle(None).await
    }

    /// Fetches every feed without touching persisted state or notifying.
    pub async fn show_latest(&self) -> Vec<LatestEntry> {
        let fetches = self.feeds.iter().map(|feed| async move {
            LatestEntry {
                feed: feed.clone(),
                result: self.fetch(feed).await,
            }
        });
        join_all(fetches).await
    }

    /// Sends the feed's current snapshot to every destination, changed or not.
    pub async fn push_latest(&self, key: &str) -> Result<FanoutReport> {
        let feed = self
            .find_feed(key)
            .ok_or_else(|| McUpdateError::UnknownFeed(key.to_string()))?;

        let snapshot = self.fetch(feed).await?;
        let message = format_message(&self.settings.banner, feed, &snapshot);
        let destinations = self.list_destinations();
        info!(feed = %feed.name, destinations = destinations.len(), "Pushing latest article");

        Ok(self.notifier.notify(&destinations, &message).await)
    }

    pub fn add_destination(&self, id: &str) -> std::result::Result<AddOutcome, PersistenceError> {
        let mut state = self.state();
        let before = state.destinations.clone();

        let outcome = state.destinations.add(id);
        if outcome == AddOutcome::Added {
            if let Err(e) = self.save(&state) {
                state.destinations = before;
                return Err(e);
            }
            info!(destination = %id, "Destination added");
        }
        Ok(outcome)
    }

    pub fn remove_destination(
        &self,
        id: &str,
    ) -> std::result::Result<RemoveOutcome, PersistenceError> {
        let mut state = self.state();
        let before = state.destinations.clone();

        let outcome = state.destinations.remove(id);
        if outcome == RemoveOutcome::Removed {
            if let Err(e) = self.save(&state) {
                state.destinations = before;
                return Err(e);
            }
            info!(destination = %id, "Destination removed");
        }
        Ok(outcome)
    }

    pub fn list_destinations(&self) -> Vec<String> {
        self.state().destinations.list().to_vec()
    }

    pub fn versions(&self) -> VersionRecord {
        self.state().versions.clone()
    }

    pub fn status(&self) -> PollStatus {
        let state = self.state();
        PollStatus {
            lifecycle: state.lifecycle,
            last_errors: state.last_errors.clone(),
            destinations: state.destinations.len(),
            tracked_feeds: state.versions.len(),
        }
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.state().lifecycle = lifecycle;
    }

    async fn fetch(&self, feed: &FeedDescriptor) -> std::result::Result<Snapshot, FetchError> {
        match tokio::time::timeout(self.settings.fetch_deadline, self.fetcher.fetch(feed)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    fn record(&self, feed: &FeedDescriptor, snapshot: Snapshot) {
        let mut state = self.state();
        state.versions.insert(feed.name.clone(), snapshot);
        self.persist(&state);
    }

    fn record_failure(&self, feed: &FeedDescriptor, err: &FetchError) {
        warn!(feed = %feed.name, kind = err.kind(), "Fetch failed: {}", err);
        self.state()
            .last_errors
            .insert(feed.name.clone(), err.to_string());
    }

    fn save(&self, state: &EngineState) -> std::result::Result<(), PersistenceError> {
        self.store.save(&PersistedState {
            versions: state.versions.clone(),
            destinations: Some(state.destinations.list().to_vec()),
        })
    }

    /// Write failures are logged only; a restart may then re-notify.
    fn persist(&self, state: &EngineState) {
        if let Err(e) = self.save(state) {
            error!("Failed to persist state: {}", e);
        }
    }
}

fn stop_requested(shutdown: Option<&watch::Receiver<bool>>) -> bool {
    shutdown.is_some_and(|rx| *rx.borrow())
}
