//! Tools to build metadata sources from configuration.

use crate::{FixedSource, HttpSource, MemoryCacheSource, TimeoutSource};
use anyhow::Result;
use async_recursion::async_recursion;
use cadence::StatsdClient;
use scout_settings::{metadata::MetadataSourceConfig, Settings};
use scout_suggest::{MetadataSource, NullSource};

/// Recursive helper to build a tree of metadata sources.
#[async_recursion]
pub async fn make_source_tree(
    settings: &Settings,
    config: &MetadataSourceConfig,
    metrics_client: &StatsdClient,
) -> Result<Box<dyn MetadataSource>> {
    let source: Box<dyn MetadataSource> = match config {
        MetadataSourceConfig::Http(http_config) => HttpSource::new_boxed(http_config)?,

        MetadataSourceConfig::MemoryCache(memory_config) => {
            let inner =
                make_source_tree(settings, memory_config.inner.as_ref(), metrics_client).await?;
            MemoryCacheSource::new_boxed(memory_config, inner, metrics_client.clone())
        }

        MetadataSourceConfig::Timeout(timeout_config) => {
            let inner =
                make_source_tree(settings, timeout_config.inner.as_ref(), metrics_client).await?;
            TimeoutSource::new_boxed(timeout_config, inner)
        }

        MetadataSourceConfig::Fixed(fixed_config) => {
            FixedSource::new_boxed(settings, fixed_config)?
        }

        MetadataSourceConfig::Null => Box::new(NullSource),
    };
    tracing::debug!(source = %source.name(), "built metadata source");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::make_source_tree;
    use cadence::{NopMetricSink, StatsdClient};
    use scout_settings::{
        metadata::{HttpSourceConfig, MemoryCacheConfig, MetadataSourceConfig, TimeoutConfig},
        Settings,
    };
    use scout_suggest::MetadataSource;

    #[tokio::test]
    async fn builds_nested_sources() -> anyhow::Result<()> {
        let settings = Settings::load_for_tests(|_| ());
        let config = MetadataSourceConfig::MemoryCache(MemoryCacheConfig::with_inner(
            MetadataSourceConfig::Timeout(TimeoutConfig {
                inner: Box::new(MetadataSourceConfig::Http(HttpSourceConfig::default())),
                ..TimeoutConfig::default()
            }),
        ));

        let source = make_source_tree(
            &settings,
            &config,
            &StatsdClient::from_sink("scout-test", NopMetricSink),
        )
        .await?;
        assert_eq!(
            source.name(),
            "MemoryCacheSource(timeout(HttpSource(http://localhost:8000/api/autocomplete)))"
        );
        assert!(!source.is_null());
        Ok(())
    }

    #[tokio::test]
    async fn null_wrappers_stay_null() -> anyhow::Result<()> {
        let settings = Settings::load_for_tests(|_| ());
        let config = MetadataSourceConfig::MemoryCache(MemoryCacheConfig::default());

        let source = make_source_tree(
            &settings,
            &config,
            &StatsdClient::from_sink("scout-test", NopMetricSink),
        )
        .await?;
        assert!(source.is_null());
        Ok(())
    }

    #[tokio::test]
    async fn setup_errors_propagate() {
        let settings = Settings::load_for_tests(|settings| settings.debug = false);
        let config = MetadataSourceConfig::Timeout(TimeoutConfig {
            inner: Box::new(MetadataSourceConfig::Fixed(
                scout_settings::metadata::FixedConfig {
                    path: "../config/fixtures/metadata.json".into(),
                },
            )),
            ..TimeoutConfig::default()
        });

        let result = make_source_tree(
            &settings,
            &config,
            &StatsdClient::from_sink("scout-test", NopMetricSink),
        )
        .await;
        assert!(result.is_err());
    }
}
