//! Async completion polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::error::{Error, Result};
use super::pending::PendingBatch;

/// Default number of passes in bounded polling.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait before each bounded pass.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default timeout for one readiness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether a result URL serves content yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
}

/// Checks a single URL for readiness.
///
/// Probes never fail: anything short of a positive answer is `Pending`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Readiness;
}

/// Probes with an HTTP `HEAD` request. Only `200 OK` counts as ready.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        // A redirect is not the asset itself.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Readiness {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => Readiness::Ready,
            Ok(resp) => {
                debug!(url, status = resp.status().as_u16(), "result not ready");
                Readiness::Pending
            }
            Err(e) => {
                debug!(url, error = %e, "probe failed");
                Readiness::Pending
            }
        }
    }
}

/// Limits for bounded polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a poll did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Passes actually run.
    pub passes: u32,
    /// URLs confirmed by this poll, not delivered before.
    pub newly_ready: Vec<String>,
}

/// Runs readiness passes over pending batches.
#[derive(Clone)]
pub struct Poller {
    prober: Arc<dyn Prober>,
    policy: RetryPolicy,
}

impl Poller {
    pub fn new(prober: Arc<dyn Prober>, policy: RetryPolicy) -> Self {
        Self { prober, policy }
    }

    /// Creates a poller that probes over HTTP.
    pub fn http(probe_timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpProber::new(probe_timeout)?), policy))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Probes each URL once, in order, and returns the ready ones.
    pub(crate) async fn ready_among(&self, urls: &[String]) -> Vec<String> {
        let mut ready = Vec::new();
        for url in urls {
            if self.prober.probe(url).await == Readiness::Ready {
                ready.push(url.clone());
            }
        }
        ready
    }

    /// Single pass: probes every pending URL once.
    ///
    /// Returns the URLs confirmed by this pass. A settled batch yields nothing.
    pub async fn poll_once(&self, batch: &mut PendingBatch) -> Vec<String> {
        if batch.is_settled() {
            return Vec::new();
        }
        let ready = self.ready_among(batch.pending()).await;
        batch.mark_ready(&ready)
    }

    /// Bounded wait: waits the policy interval before each pass, for at most
    /// `max_attempts` passes, and stops at the first pass that finds anything.
    ///
    /// Finding nothing is not an error; poll again later.
    pub async fn poll_bounded<T>(&self, target: &mut T) -> Result<PollReport>
    where
        T: PollTarget + ?Sized,
    {
        let mut report = PollReport::default();
        while report.passes < self.policy.max_attempts && !target.is_settled() {
            tokio::time::sleep(self.policy.interval).await;
            report.passes += 1;
            let newly = target.pass(self).await?;
            if !newly.is_empty() {
                report.newly_ready = newly;
                break;
            }
        }
        Ok(report)
    }
}

/// A batch that bounded polling can drive one pass at a time.
#[async_trait]
pub trait PollTarget: Send {
    /// Runs one pass and returns the URLs it confirmed.
    async fn pass(&mut self, poller: &Poller) -> Result<Vec<String>>;

    fn is_settled(&self) -> bool;
}

#[async_trait]
impl PollTarget for PendingBatch {
    async fn pass(&mut self, poller: &Poller) -> Result<Vec<String>> {
        Ok(poller.poll_once(self).await)
    }

    fn is_settled(&self) -> bool {
        PendingBatch::is_settled(self)
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Ready once `ready_from` probes have been made.
    struct CountingProber {
        calls: AtomicU32,
        ready_from: u32,
    }

    impl CountingProber {
        fn new(ready_from: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                ready_from,
            })
        }
    }

    #[async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _url: &str) -> Readiness {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.ready_from {
                Readiness::Ready
            } else {
                Readiness::Pending
            }
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(1),
        }
    }

    fn batch() -> PendingBatch {
        PendingBatch::new(vec!["https://x/1.png".to_string()])
    }

    #[tokio::test]
    async fn bounded_stops_at_first_ready_pass() {
        let prober = CountingProber::new(2);
        let poller = Poller::new(prober.clone(), fast());
        let mut batch = batch();

        let report = poller.poll_bounded(&mut batch).await.unwrap();

        assert_eq!(report.passes, 2);
        assert_eq!(report.newly_ready, vec!["https://x/1.png"]);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bounded_gives_up_after_max_attempts() {
        let prober = CountingProber::new(u32::MAX);
        let poller = Poller::new(prober.clone(), fast());
        let mut batch = batch();

        let report = poller.poll_bounded(&mut batch).await.unwrap();

        assert_eq!(report.passes, 3);
        assert!(report.newly_ready.is_empty());
        assert_eq!(batch.pending().len(), 1);
    }

    #[tokio::test]
    async fn polling_settled_batch_is_noop() {
        let prober = CountingProber::new(1);
        let poller = Poller::new(prober.clone(), fast());
        let mut batch = batch();

        assert_eq!(poller.poll_once(&mut batch).await.len(), 1);
        assert!(poller.poll_once(&mut batch).await.is_empty());
        let report = poller.poll_bounded(&mut batch).await.unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(batch.ready(), &["https://x/1.png".to_string()]);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_waits_before_each_pass() {
        let poller = Poller::new(CountingProber::new(u32::MAX), RetryPolicy::default());
        let mut batch = batch();

        let start = tokio::time::Instant::now();
        let report = poller.poll_bounded(&mut batch).await.unwrap();

        assert_eq!(report.passes, DEFAULT_MAX_ATTEMPTS);
        assert!(start.elapsed() >= DEFAULT_POLL_INTERVAL * DEFAULT_MAX_ATTEMPTS);
    }
}
