//! Test doubles shared by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::app::{DeliveryError, FetchError};
use crate::domain::{FeedDescriptor, Snapshot};
use crate::fetcher::Fetcher;
use crate::notifier::{DeliveryReceipt, Transport};

/// Plays back queued results per feed name. The last queued result repeats.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, VecDeque<Result<Snapshot, FetchError>>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, feed: &str, result: Result<Snapshot, FetchError>) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(feed.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn hang(&self, feed: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(feed.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self, feed: &str) -> Result<Snapshot, FetchError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        match script.get_mut(feed) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Err(FetchError::Empty)),
            Some(queue) => queue.front().cloned().unwrap_or(Err(FetchError::Empty)),
            None => Err(FetchError::Empty),
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, feed: &FeedDescriptor) -> Result<Snapshot, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&feed.name)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.next(&feed.name)
    }
}

/// Records every attempt; destinations in `failing` always fail.
#[derive(Default)]
pub struct RecordingTransport {
    failing: HashSet<String>,
    attempts: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: destinations.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<DeliveryReceipt, DeliveryError> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination.to_string());

        if self.failing.contains(destination) {
            return Err(DeliveryError::Failed {
                destination: destination.to_string(),
                reason: "unreachable".into(),
            });
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((destination.to_string(), message.to_string()));

        Ok(DeliveryReceipt {
            destination: destination.to_string(),
            delivered_at: Utc::now(),
        })
    }
}
