//! Tools to make sure sources don't take excessive amounts of time.

use async_trait::async_trait;
use scout_settings::metadata::TimeoutConfig;
use scout_suggest::{FetchError, FetchKey, MetadataSource, UrlMetadata};
use std::time::Duration;

/// A combinator source that fails with [`FetchError::Timeout`] if the wrapped
/// source takes too long.
pub struct TimeoutSource {
    /// The time to wait before giving up.
    max_time: Duration,

    /// The source to pull metadata from.
    inner: Box<dyn MetadataSource>,
}

impl TimeoutSource {
    /// Construct a new, boxed timeout source.
    #[must_use]
    pub fn new_boxed(config: &TimeoutConfig, inner: Box<dyn MetadataSource>) -> Box<Self> {
        Box::new(Self {
            max_time: config.max_time,
            inner,
        })
    }
}

#[async_trait]
impl MetadataSource for TimeoutSource {
    fn name(&self) -> String {
        format!("timeout({})", self.inner.name())
    }

    fn is_null(&self) -> bool {
        self.inner.is_null()
    }

    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
        let inner_fut = self.inner.fetch(key);
        tokio::time::timeout(self.max_time, inner_fut)
            .await
            .unwrap_or_else(|_timeout_elapsed| {
                tracing::debug!(max_time = ?self.max_time, "metadata source timed out");
                Err(FetchError::Timeout(self.max_time))
            })
    }
}
