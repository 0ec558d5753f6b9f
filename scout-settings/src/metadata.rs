//! Configuration for the sources that provide completion metadata.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::path::PathBuf;
use std::time::Duration;

/// A node in the tree of metadata sources.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetadataSourceConfig {
    /// Query the autocomplete service.
    Http(HttpSourceConfig),
    /// Cache another source in memory.
    MemoryCache(MemoryCacheConfig),
    /// Give up on another source after a while.
    Timeout(TimeoutConfig),
    /// Serve a fixture from disk.
    Fixed(FixedConfig),
    /// Always return empty metadata.
    Null,
}

/// Fetch metadata from the autocomplete HTTP endpoint.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// The endpoint to query. The request URL and API version are appended as
    /// the `url` and `graphVersion` query parameters.
    pub endpoint: String,

    /// The user agent sent with every request.
    pub user_agent: String,

    /// The maximum time to wait while establishing a connection.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "connect_timeout_ms")]
    pub connect_timeout: Duration,

    /// The maximum time a whole request may take.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "request_timeout_ms")]
    pub request_timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/api/autocomplete".to_string(),
            user_agent: concat!("scout/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_millis(2000),
            request_timeout: Duration::from_millis(5000),
        }
    }
}

/// Keep successful fetches of the inner source in memory.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// How long a fetched metadata document stays valid.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "default_ttl_sec")]
    pub default_ttl: Duration,

    /// The cached source.
    pub inner: Box<MetadataSourceConfig>,
}

impl MemoryCacheConfig {
    /// A cache with the default TTL around `inner`.
    #[must_use]
    pub fn with_inner(inner: MetadataSourceConfig) -> Self {
        Self {
            inner: Box::new(inner),
            ..Self::default()
        }
    }
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(900),
            inner: Box::new(MetadataSourceConfig::Null),
        }
    }
}

/// Fail fetches of the inner source that take too long.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// The time to wait before giving up on the inner source.
    #[serde_as(as = "DurationMilliSeconds")]
    #[serde(rename = "max_time_ms")]
    pub max_time: Duration,

    /// The source to time out.
    pub inner: Box<MetadataSourceConfig>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            max_time: Duration::from_millis(3000),
            inner: Box::new(MetadataSourceConfig::Null),
        }
    }
}

/// Serve metadata from a JSON document on disk. Only allowed in debug mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedConfig {
    /// A JSON object mapping `"{version}/{request_url}"` to metadata documents.
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::MetadataSourceConfig;
    use anyhow::{Context, Result};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn source_defaults_are_optional() -> Result<()> {
        // Sources are allowed to have required fields, if there is no logical
        // default. If that's the case, make sure to add them here.
        let value_json = json!([
            { "type": "http" },
            { "type": "memory_cache" },
            { "type": "timeout" },
            { "type": "fixed", "path": "fixtures/metadata.json" },
            { "type": "null" },
        ]);

        let sources: Vec<MetadataSourceConfig> =
            serde_json::from_value(value_json).context("could not parse sources")?;

        let mut found_sources = 0;
        for source in sources {
            // If you have to add a case to this match, add it to `value_json`
            // above as well so it can be tested.
            found_sources += 1;
            assert!(
                match source {
                    MetadataSourceConfig::Http(_)
                    | MetadataSourceConfig::MemoryCache(_)
                    | MetadataSourceConfig::Timeout(_)
                    | MetadataSourceConfig::Fixed(_)
                    | MetadataSourceConfig::Null => true,
                },
                "all sources should be recognized"
            );
        }
        assert_eq!(found_sources, 5);

        Ok(())
    }

    #[test]
    fn nested_sources_parse() -> Result<()> {
        let config: MetadataSourceConfig = serde_json::from_value(json!({
            "type": "memory_cache",
            "default_ttl_sec": 60,
            "inner": {
                "type": "timeout",
                "max_time_ms": 250,
                "inner": { "type": "http", "endpoint": "http://example.com/autocomplete" }
            }
        }))?;

        let cache = match config {
            MetadataSourceConfig::MemoryCache(cache) => cache,
            other => panic!("unexpected source {:?}", other),
        };
        assert_eq!(cache.default_ttl, Duration::from_secs(60));
        let timeout = match *cache.inner {
            MetadataSourceConfig::Timeout(timeout) => timeout,
            other => panic!("unexpected source {:?}", other),
        };
        assert_eq!(timeout.max_time, Duration::from_millis(250));
        assert!(matches!(*timeout.inner, MetadataSourceConfig::Http(ref http)
            if http.endpoint == "http://example.com/autocomplete"));

        Ok(())
    }
}
