//! Pending batches of asynchronously generated results.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::error::{Error, Result};
use super::poll::{PollReport, PollTarget, Poller};
use super::request::OperationKind;

// ==================== Batch Key ====================

/// Identifies a batch: one per session and feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub session: String,
    pub feature: OperationKind,
}

impl BatchKey {
    pub fn new(session: impl Into<String>, feature: OperationKind) -> Self {
        Self {
            session: session.into(),
            feature,
        }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.feature)
    }
}

// ==================== Pending Batch ====================

/// Lifecycle of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No URL confirmed yet.
    Submitted,
    /// Some URLs confirmed, some still pending.
    PartiallyReady,
    /// Every URL confirmed.
    AllReady,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Submitted => "submitted",
            BatchState::PartiallyReady => "partially_ready",
            BatchState::AllReady => "all_ready",
        }
    }
}

/// URLs returned by an async submission, split into pending and ready.
///
/// A URL moves from pending to ready at most once and never back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBatch {
    submitted: Vec<String>,
    pending: Vec<String>,
    ready: Vec<String>,
    result: Option<String>,
    overflow: Vec<String>,
}

impl PendingBatch {
    /// Creates a batch. Duplicate URLs are dropped, order is kept.
    pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
        let mut submitted: Vec<String> = Vec::new();
        for url in urls {
            if !submitted.contains(&url) {
                submitted.push(url);
            }
        }
        Self {
            pending: submitted.clone(),
            submitted,
            ready: Vec::new(),
            result: None,
            overflow: Vec::new(),
        }
    }

    pub fn submitted(&self) -> &[String] {
        &self.submitted
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// URLs already confirmed and delivered.
    pub fn ready(&self) -> &[String] {
        &self.ready
    }

    /// First URL of the most recent pass that found anything.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// All URLs of the most recent pass when it found more than one.
    pub fn overflow(&self) -> &[String] {
        &self.overflow
    }

    pub fn state(&self) -> BatchState {
        if self.ready.is_empty() && !self.pending.is_empty() {
            BatchState::Submitted
        } else if self.pending.is_empty() {
            BatchState::AllReady
        } else {
            BatchState::PartiallyReady
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Moves the given URLs from pending to ready.
    ///
    /// URLs that are not pending (already ready, or never submitted) are
    /// ignored. Returns the URLs that actually moved, in submission order.
    pub fn mark_ready(&mut self, urls: &[String]) -> Vec<String> {
        let (newly, still): (Vec<String>, Vec<String>) = self
            .pending
            .drain(..)
            .partition(|url| urls.contains(url));
        self.pending = still;

        if !newly.is_empty() {
            self.result = newly.first().cloned();
            self.overflow = if newly.len() > 1 {
                newly.clone()
            } else {
                Vec::new()
            };
            self.ready.extend(newly.iter().cloned());
        }
        newly
    }
}

// ==================== Pending Store ====================

/// Result of polling a stored batch.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub report: PollReport,
    /// Batch as it stands after the poll.
    pub batch: PendingBatch,
}

/// Batches keyed by session and feature.
///
/// Probes run without holding the lock; their results are applied in one
/// critical section, so two concurrent polls never deliver a URL twice.
#[derive(Debug, Default)]
pub struct PendingStore {
    batches: Mutex<HashMap<BatchKey, Entry>>,
}

#[derive(Debug)]
struct Entry {
    batch: PendingBatch,
    /// Last insert or poll.
    touched: Instant,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a batch, replacing any older batch under the same key.
    pub async fn insert(&self, key: BatchKey, batch: PendingBatch) {
        let entry = Entry {
            batch,
            touched: Instant::now(),
        };
        let replaced = self.batches.lock().await.insert(key.clone(), entry);
        if replaced.is_some() {
            debug!(batch = %key, "replaced pending batch");
        }
    }

    /// Returns a snapshot of a batch.
    pub async fn get(&self, key: &BatchKey) -> Option<PendingBatch> {
        self.batches.lock().await.get(key).map(|e| e.batch.clone())
    }

    /// Removes a batch. Returns it if it existed.
    pub async fn remove(&self, key: &BatchKey) -> Option<PendingBatch> {
        self.batches.lock().await.remove(key).map(|e| e.batch)
    }

    pub async fn len(&self) -> usize {
        self.batches.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.batches.lock().await.is_empty()
    }

    /// Drops batches that were neither stored nor polled within `max_idle`.
    /// Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut batches = self.batches.lock().await;
        let before = batches.len();
        batches.retain(|key, entry| {
            let keep = entry.touched.elapsed() < max_idle;
            if !keep {
                debug!(batch = %key, state = entry.batch.state().as_str(), "evicting idle batch");
            }
            keep
        });
        before - batches.len()
    }

    /// Runs one poll pass over a stored batch.
    pub async fn poll(&self, key: &BatchKey, poller: &Poller) -> Result<PollOutcome> {
        let (newly_ready, batch) = self.pass(key, poller).await?;
        Ok(PollOutcome {
            report: PollReport {
                passes: 1,
                newly_ready,
            },
            batch,
        })
    }

    /// Bounded poll of a stored batch; see [`Poller::poll_bounded`].
    pub async fn poll_bounded(&self, key: &BatchKey, poller: &Poller) -> Result<PollOutcome> {
        let batch = self.get(key).await.ok_or_else(|| missing(key))?;
        let mut target = Stored {
            store: self,
            key,
            batch,
        };
        let report = poller.poll_bounded(&mut target).await?;
        Ok(PollOutcome {
            report,
            batch: target.batch,
        })
    }

    async fn pass(&self, key: &BatchKey, poller: &Poller) -> Result<(Vec<String>, PendingBatch)> {
        let pending = {
            let batches = self.batches.lock().await;
            let entry = batches.get(key).ok_or_else(|| missing(key))?;
            entry.batch.pending().to_vec()
        };

        let ready = poller.ready_among(&pending).await;

        let mut batches = self.batches.lock().await;
        // Abandoned while probing.
        let entry = batches.get_mut(key).ok_or_else(|| missing(key))?;
        entry.touched = Instant::now();
        let newly = entry.batch.mark_ready(&ready);
        debug!(batch = %key, newly = newly.len(), pending = entry.batch.pending().len(), "poll pass");
        Ok((newly, entry.batch.clone()))
    }
}

/// A stored batch seen through the store, with its latest snapshot.
struct Stored<'a> {
    store: &'a PendingStore,
    key: &'a BatchKey,
    batch: PendingBatch,
}

#[async_trait]
impl<'a> PollTarget for Stored<'a> {
    async fn pass(&mut self, poller: &Poller) -> Result<Vec<String>> {
        let (newly, batch) = self.store.pass(self.key, poller).await?;
        self.batch = batch;
        Ok(newly)
    }

    fn is_settled(&self) -> bool {
        self.batch.is_settled()
    }
}

fn missing(key: &BatchKey) -> Error {
    Error::NoPendingBatch(key.to_string())
}
