//! A cache that keeps fetched metadata in local memory.

use async_trait::async_trait;
use cadence::{CountedExt, StatsdClient};
use dashmap::{mapref::entry::Entry, DashMap};
use scout_settings::metadata::MemoryCacheConfig;
use scout_suggest::{FetchError, FetchKey, MetadataSource, UrlMetadata};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// An entry in the in-memory store, that includes an expiration time.
#[derive(Debug)]
struct CacheEntry {
    /// The cached metadata.
    metadata: UrlMetadata,

    /// After this time, the cache entry should no longer be considered valid,
    /// and should be removed.
    expiration: Instant,
}

/// An in-memory cache in front of another metadata source. Only successful
/// fetches are stored.
pub struct MemoryCacheSource {
    /// The source to query on cache miss.
    inner: Box<dyn MetadataSource>,

    /// The items stored in the cache.
    items: DashMap<FetchKey, CacheEntry>,

    /// How long an item stays valid.
    default_ttl: Duration,

    /// The Statsd client used to count hits and misses.
    metrics_client: StatsdClient,
}

impl MemoryCacheSource {
    /// Create an in-memory cache that wraps `inner`.
    #[must_use]
    pub fn new_boxed(
        config: &MemoryCacheConfig,
        inner: Box<dyn MetadataSource>,
        metrics_client: StatsdClient,
    ) -> Box<Self> {
        Box::new(Self {
            inner,
            items: DashMap::new(),
            default_ttl: config.default_ttl,
            metrics_client,
        })
    }

    /// The cached metadata for `key`, if present and not expired. Expired
    /// entries are removed.
    fn lookup(&self, key: &FetchKey, now: Instant) -> Option<UrlMetadata> {
        match self.items.entry(key.clone()) {
            Entry::Occupied(occupied_entry) => {
                if now >= occupied_entry.get().expiration {
                    tracing::debug!("cache expired");
                    occupied_entry.remove();
                    None
                } else {
                    Some(occupied_entry.get().metadata.clone())
                }
            }
            Entry::Vacant(_) => None,
        }
    }
}

#[async_trait]
impl MetadataSource for MemoryCacheSource {
    fn name(&self) -> String {
        format!("MemoryCacheSource({})", self.inner.name())
    }

    fn is_null(&self) -> bool {
        self.inner.is_null()
    }

    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
        let now = Instant::now();
        let span = tracing::debug_span!("memory-fetch", %key);

        async move {
            // `lookup` must release its entry guard before the write below, or
            // the insert would deadlock on the same shard.
            if let Some(metadata) = self.lookup(&key, now) {
                tracing::debug!("cache hit");
                self.metrics_client.incr("metadata.cache.hit").ok();
                return Ok(metadata);
            }

            tracing::debug!("cache miss");
            self.metrics_client.incr("metadata.cache.miss").ok();

            let metadata = self.inner.fetch(key.clone()).await?;
            let expiration = now + self.default_ttl;
            tracing::debug!(?now, ?expiration, "inserting into cache");
            self.items.insert(
                key,
                CacheEntry {
                    metadata: metadata.clone(),
                    expiration,
                },
            );

            Ok(metadata)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryCacheSource;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use cadence::{MetricSink, NopMetricSink, SpyMetricSink, StatsdClient};
    use fake::{Fake, Faker};
    use pretty_assertions::assert_eq;
    use scout_settings::metadata::MemoryCacheConfig;
    use scout_suggest::{FetchError, FetchKey, MetadataSource, UrlMetadata};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::panic::RefUnwindSafe;
    use std::time::Duration;

    /// Counts its calls, and fails when asked to.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        fn name(&self) -> String {
            "CountingSource".to_string()
        }

        async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Network(anyhow!("offline")))
            } else {
                Ok(UrlMetadata {
                    url: format!("/{}", key.request_url),
                    ..Faker.fake()
                })
            }
        }
    }

    fn cache<S>(ttl: Duration, fail: bool, sink: S) -> (MemoryCacheSource, Arc<AtomicUsize>)
    where
        S: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = MemoryCacheSource::new_boxed(
            &MemoryCacheConfig {
                default_ttl: ttl,
                ..MemoryCacheConfig::default()
            },
            Box::new(CountingSource {
                calls: calls.clone(),
                fail,
            }),
            StatsdClient::from_sink("scout-test", sink),
        );
        (*source, calls)
    }

    #[tokio::test]
    async fn second_fetch_is_a_hit() -> anyhow::Result<()> {
        let (rx, sink) = SpyMetricSink::new();
        let (source, calls) = cache(Duration::from_secs(60), false, sink);
        let key = FetchKey::new("users", "v1.0");

        let first = source.fetch(key.clone()).await?;
        let second = source.fetch(key).await?;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let sent: Vec<String> = rx
            .try_iter()
            .map(|sent| String::from_utf8(sent).expect("metrics are utf-8"))
            .collect();
        assert_eq!(
            sent,
            vec![
                "scout-test.metadata.cache.miss:1|c",
                "scout-test.metadata.cache.hit:1|c"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn keys_are_cached_separately() -> anyhow::Result<()> {
        let (source, calls) = cache(Duration::from_secs(60), false, NopMetricSink);

        source.fetch(FetchKey::new("users", "v1.0")).await?;
        source.fetch(FetchKey::new("users", "beta")).await?;
        source.fetch(FetchKey::new("groups", "v1.0")).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() -> anyhow::Result<()> {
        let (source, calls) = cache(Duration::from_secs(0), false, NopMetricSink);
        let key = FetchKey::new("me", "v1.0");

        source.fetch(key.clone()).await?;
        source.fetch(key).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (source, calls) = cache(Duration::from_secs(60), true, NopMetricSink);
        let key = FetchKey::new("me", "v1.0");

        assert!(source.fetch(key.clone()).await.is_err());
        assert!(source.fetch(key).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
