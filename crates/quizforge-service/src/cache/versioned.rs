use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use quizforge_core::Quiz;
use quizforge_storage::{QuizSource, StorageError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::entry::CacheEntry;
use super::generation::{Generation, Generations};
use super::invalidate::Invalidator;
use super::key::CacheKey;
use super::tier::CacheTier;
use crate::analytics::AnalyticsRecorder;
use crate::error::QuizError;
use crate::metrics;

/// Cheap lookup of a quiz's current version watermark.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Returns the current version, or `None` if the quiz no longer exists.
    async fn latest_version(&self, quiz_id: &str) -> Result<Option<String>, StorageError>;
}

#[async_trait]
impl<S> VersionProbe for S
where
    S: QuizSource + ?Sized,
{
    async fn latest_version(&self, quiz_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self.quiz_version(quiz_id).await?.map(|ts| ts.to_string()))
    }
}

/// How a read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A current entry was returned without loading.
    Hit,
    /// No live entry existed; the loader ran.
    Miss,
    /// A TTL-valid entry was rejected because its version fell behind.
    Stale,
    /// The cache was not consulted.
    Bypass,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Stale => "stale",
            CacheOutcome::Bypass => "bypass",
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit)
    }
}

/// An aggregate together with how it was obtained.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub quiz: Quiz,
    pub outcome: CacheOutcome,
}

#[derive(Debug, Clone)]
enum ProbeVerdict {
    Latest(String),
    Gone,
    /// The probe failed; cached data is trusted.
    Unknown,
}

impl ProbeVerdict {
    fn accepts(&self, entry: &CacheEntry) -> bool {
        match self {
            ProbeVerdict::Latest(version) => entry.is_current(version),
            ProbeVerdict::Gone => false,
            ProbeVerdict::Unknown => true,
        }
    }
}

/// Read-through cache that validates entries against the source watermark.
///
/// A read of `quiz:{id}:type:{filter}` is served from the exact key or, for
/// filtered reads, from the canonical `all` entry re-filtered in memory.
/// Tier failures are logged and treated as misses.
pub struct VersionedCache {
    tier: Arc<dyn CacheTier>,
    analytics: Arc<dyn AnalyticsRecorder>,
    ttl: Duration,
    generations: Arc<Generations>,
    flights: Option<DashMap<String, Arc<Mutex<()>>>>,
}

/// Holds a per-key load lock; the map entry goes away with its last holder.
struct FlightGuard<'a> {
    flights: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.flights
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl VersionedCache {
    pub fn new(
        tier: Arc<dyn CacheTier>,
        analytics: Arc<dyn AnalyticsRecorder>,
        ttl: Duration,
    ) -> Self {
        Self {
            tier,
            analytics,
            ttl,
            generations: Arc::new(Generations::new()),
            flights: None,
        }
    }

    /// Serializes concurrent loads of the same key behind a per-key lock.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(DashMap::new);
        self
    }

    pub fn tier(&self) -> &Arc<dyn CacheTier> {
        &self.tier
    }

    pub fn analytics(&self) -> &Arc<dyn AnalyticsRecorder> {
        &self.analytics
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// An invalidator over the same tier whose clears also discard loads
    /// still in flight.
    pub fn invalidator(&self) -> Invalidator {
        Invalidator::new(
            Arc::clone(&self.tier),
            Arc::clone(&self.analytics),
            Arc::clone(&self.generations),
        )
    }

    /// Returns the cached aggregate for `key` if it is current, otherwise
    /// runs `loader` and stores its result under `key`.
    ///
    /// Exactly one hit or miss is recorded per call, against `key`.
    pub async fn get_or_load<P, L, Fut>(
        &self,
        key: &CacheKey,
        probe: &P,
        loader: L,
    ) -> Result<CacheRead, QuizError>
    where
        P: VersionProbe + ?Sized,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<Quiz, QuizError>>,
    {
        let rendered = key.to_string();
        let _flight = self.enter_flight(&rendered).await;
        let backend = self.tier.backend();

        let mut candidates = vec![rendered.clone()];
        if !key.is_canonical() {
            candidates.push(key.to_canonical().to_string());
        }

        let mut verdict: Option<ProbeVerdict> = None;
        let mut stale = false;
        for candidate in &candidates {
            let Some(entry) = self.read(candidate).await else {
                continue;
            };
            if verdict.is_none() {
                verdict = Some(self.probe(probe, key.quiz_id()).await);
            }
            if verdict.as_ref().is_some_and(|v| v.accepts(&entry)) {
                self.analytics.record_hit(&rendered).await;
                metrics::record_cache_hit(backend.as_str());
                tracing::debug!(key = %rendered, served_from = %candidate, "cache hit");
                return Ok(CacheRead {
                    quiz: entry.data.filtered(key.filter()),
                    outcome: CacheOutcome::Hit,
                });
            }
            stale = true;
        }

        self.analytics.record_miss(&rendered).await;
        if stale {
            metrics::record_cache_stale(backend.as_str());
            tracing::debug!(key = %rendered, "cache entry stale, reloading");
        } else {
            metrics::record_cache_miss(backend.as_str());
            tracing::debug!(key = %rendered, "cache miss");
        }

        let generation = self.generations.current(key.quiz_id());
        match loader().await {
            Ok(quiz) => {
                let entry = CacheEntry::new(quiz);
                self.write_unless_cleared(&rendered, key.quiz_id(), generation, &entry)
                    .await;
                Ok(CacheRead {
                    quiz: entry.data,
                    outcome: if stale {
                        CacheOutcome::Stale
                    } else {
                        CacheOutcome::Miss
                    },
                })
            }
            Err(e) => {
                if e.is_not_found() && stale {
                    for candidate in &candidates {
                        if let Err(err) = self.tier.delete(candidate).await {
                            tracing::warn!(key = %candidate, error = %err, "failed to drop entry of deleted quiz");
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Writes `quiz` under `key` unconditionally.
    pub async fn store(&self, key: &CacheKey, quiz: Quiz) {
        self.write(&key.to_string(), &CacheEntry::new(quiz)).await;
    }

    /// Stores a loaded entry unless a clear of its quiz ran since `seen`.
    ///
    /// The epoch is checked again after the write: a clear that bumped it in
    /// between may have deleted before the entry landed.
    async fn write_unless_cleared(
        &self,
        key: &str,
        quiz_id: &str,
        seen: Generation,
        entry: &CacheEntry,
    ) {
        if !self.generations.is_current(quiz_id, seen) {
            tracing::debug!(key = %key, "cleared during load, result not cached");
            return;
        }
        self.write(key, entry).await;
        if !self.generations.is_current(quiz_id, seen)
            && let Err(e) = self.tier.delete(key).await
        {
            tracing::warn!(key = %key, error = %e, "failed to drop entry cleared during load");
        }
    }

    async fn read(&self, key: &str) -> Option<Arc<CacheEntry>> {
        match self.tier.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                metrics::record_cache_error(self.tier.backend().as_str(), "get");
                None
            }
        }
    }

    async fn write(&self, key: &str, entry: &CacheEntry) {
        match self.tier.set(key, entry, self.ttl).await {
            Ok(()) => self.analytics.record_operation("set").await,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache write failed");
                metrics::record_cache_error(self.tier.backend().as_str(), "set");
            }
        }
    }

    async fn probe<P: VersionProbe + ?Sized>(&self, probe: &P, quiz_id: &str) -> ProbeVerdict {
        match probe.latest_version(quiz_id).await {
            Ok(Some(version)) => ProbeVerdict::Latest(version),
            Ok(None) => ProbeVerdict::Gone,
            Err(e) => {
                tracing::warn!(
                    quiz_id = %quiz_id,
                    operation = "version_probe",
                    error = %e,
                    "version probe failed, serving cached entry"
                );
                ProbeVerdict::Unknown
            }
        }
    }

    async fn enter_flight(&self, key: &str) -> Option<FlightGuard<'_>> {
        let flights = self.flights.as_ref()?;
        let lock = Arc::clone(flights.entry(key.to_string()).or_default().value());
        let guard = lock.lock_owned().await;
        Some(FlightGuard {
            flights,
            key: key.to_string(),
            guard: Some(guard),
        })
    }
}
