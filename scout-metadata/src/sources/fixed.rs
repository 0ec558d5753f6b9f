//! A metadata source that serves documents from a JSON fixture.
//!
//! It is meant to be used in development and testing.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use scout_settings::{metadata::FixedConfig, Settings};
use scout_suggest::{FetchError, FetchKey, MetadataSource, SetupError, UrlMetadata};
use std::collections::HashMap;
use std::path::PathBuf;

/// Serves metadata from a fixture keyed by `"{version}/{request_url}"`. Keys
/// missing from the fixture get empty metadata.
pub struct FixedSource {
    /// Where the fixture was loaded from.
    path: PathBuf,

    /// The fixture documents, by fetch key.
    documents: HashMap<String, UrlMetadata>,
}

impl FixedSource {
    /// Load a fixed source from the file named in `config`.
    ///
    /// # Errors
    /// If not in debug mode, or if the fixture cannot be read or parsed.
    pub fn new_boxed(settings: &Settings, config: &FixedConfig) -> Result<Box<Self>, SetupError> {
        if !settings.debug {
            return Err(SetupError::InvalidConfiguration(anyhow!(
                "FixedSource can only be used in debug mode",
            )));
        }

        let raw = std::fs::read_to_string(&config.path)
            .with_context(|| format!("Reading metadata fixture {}", config.path.display()))
            .map_err(SetupError::Io)?;
        let documents = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing metadata fixture {}", config.path.display()))
            .map_err(SetupError::Format)?;

        Ok(Box::new(Self {
            path: config.path.clone(),
            documents,
        }))
    }
}

#[async_trait]
impl MetadataSource for FixedSource {
    fn name(&self) -> String {
        format!("FixedSource({})", self.path.display())
    }

    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
        match self.documents.get(&key.to_string()) {
            Some(metadata) => Ok(metadata.clone()),
            None => {
                tracing::debug!(%key, "no fixture for key");
                Ok(UrlMetadata {
                    url: format!("/{}", key.request_url),
                    ..UrlMetadata::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FixedSource;
    use http::Method;
    use pretty_assertions::assert_eq;
    use scout_settings::{metadata::FixedConfig, Settings};
    use scout_suggest::{FetchKey, MetadataSource, SetupError};

    fn fixture() -> FixedConfig {
        FixedConfig {
            path: "../config/fixtures/metadata.json".into(),
        }
    }

    #[tokio::test]
    async fn serves_fixture_documents() -> anyhow::Result<()> {
        let settings = Settings::load_for_tests(|_| ());
        let source = FixedSource::new_boxed(&settings, &fixture())?;

        let users = source.fetch(FetchKey::new("users", "v1.0")).await?;
        assert_eq!(users.url, "/users");
        let get = users
            .parameters_for(&Method::GET)
            .expect("users lists get parameters");
        assert!(get.names().contains(&"$select".to_string()));

        let root = source.fetch(FetchKey::new("", "v1.0")).await?;
        assert!(root.links.contains(&"users".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_keys_are_empty() -> anyhow::Result<()> {
        let settings = Settings::load_for_tests(|_| ());
        let source = FixedSource::new_boxed(&settings, &fixture())?;

        let metadata = source.fetch(FetchKey::new("users", "beta")).await?;
        assert_eq!(metadata.url, "/users");
        assert!(metadata.links.is_empty());
        Ok(())
    }

    #[test]
    fn requires_debug_mode() {
        let settings = Settings::load_for_tests(|settings| settings.debug = false);
        assert!(matches!(
            FixedSource::new_boxed(&settings, &fixture()),
            Err(SetupError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_fixture_is_an_io_error() {
        let settings = Settings::load_for_tests(|_| ());
        let config = FixedConfig {
            path: "../config/fixtures/does-not-exist.json".into(),
        };
        assert!(matches!(
            FixedSource::new_boxed(&settings, &config),
            Err(SetupError::Io(_))
        ));
    }
}
