//! A metadata source that queries the autocomplete HTTP service.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Url;
use scout_settings::metadata::HttpSourceConfig;
use scout_suggest::{FetchError, FetchKey, MetadataSource, SetupError, UrlMetadata};
use tracing::Instrument;

/// Fetches metadata from the autocomplete service, one request per key.
pub struct HttpSource {
    /// The HTTP client used for every request.
    client: reqwest::Client,

    /// The service endpoint, without the per-request query parameters.
    endpoint: Url,
}

impl HttpSource {
    /// Create an HTTP source from its configuration.
    ///
    /// # Errors
    /// If the endpoint is not a valid URL, or the HTTP client cannot be built.
    pub fn new_boxed(config: &HttpSourceConfig) -> Result<Box<Self>, SetupError> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid autocomplete endpoint {:?}", config.endpoint))
            .map_err(SetupError::InvalidConfiguration)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Unable to create the Reqwest client")
            .map_err(SetupError::Network)?;

        Ok(Box::new(Self { client, endpoint }))
    }

    /// The full URL metadata for `key` is requested from.
    fn request_url(&self, key: &FetchKey) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("url", &format!("/{}", key.request_url))
            .append_pair("graphVersion", &key.version);
        url
    }
}

#[async_trait]
impl MetadataSource for HttpSource {
    fn name(&self) -> String {
        format!("HttpSource({})", self.endpoint)
    }

    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
        let url = self.request_url(&key);
        let span = tracing::debug_span!("http-fetch", %key);

        async move {
            tracing::debug!(%url, "requesting metadata");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .context("Couldn't reach the autocomplete service")
                .map_err(FetchError::Network)?
                .error_for_status()
                .map_err(|error| FetchError::Network(error.into()))?;

            response.json().await.map_err(|error| {
                if error.is_decode() {
                    FetchError::Format(anyhow!("Failed to parse the JSON response: {}", error))
                } else {
                    FetchError::Network(error.into())
                }
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::HttpSource;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use scout_settings::metadata::HttpSourceConfig;
    use scout_suggest::{FetchError, FetchKey, MetadataSource, SetupError};
    use serde_json::json;

    fn config(endpoint: String) -> HttpSourceConfig {
        HttpSourceConfig {
            endpoint,
            ..HttpSourceConfig::default()
        }
    }

    #[tokio::test]
    async fn fetch_sends_path_and_version() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/autocomplete")
                    .query_param("url", "/me/messages")
                    .query_param("graphVersion", "beta");
                then.status(200).json_body(json!({
                    "url": "/me/messages",
                    "parameters": [{ "name": "get", "values": [{ "name": "$top" }] }],
                    "links": ["delta"]
                }));
            })
            .await;

        let source = HttpSource::new_boxed(&config(server.url("/api/autocomplete")))?;
        let metadata = source.fetch(FetchKey::new("me/messages", "beta")).await?;

        mock.assert_async().await;
        assert_eq!(metadata.url, "/me/messages");
        assert_eq!(metadata.links, vec!["delta"]);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_a_network_error() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/api/autocomplete");
                then.status(503);
            })
            .await;

        let source = HttpSource::new_boxed(&config(server.url("/api/autocomplete")))?;
        let result = source.fetch(FetchKey::new("users", "v1.0")).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
        Ok(())
    }

    #[tokio::test]
    async fn bad_payload_is_a_format_error() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path("/api/autocomplete");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let source = HttpSource::new_boxed(&config(server.url("/api/autocomplete")))?;
        let result = source.fetch(FetchKey::new("users", "v1.0")).await;
        assert!(matches!(result, Err(FetchError::Format(_))));
        Ok(())
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let result = HttpSource::new_boxed(&config("not a url".to_string()));
        assert!(matches!(result, Err(SetupError::InvalidConfiguration(_))));
    }

    #[test]
    fn request_url_encodes_parameters() -> anyhow::Result<()> {
        let source = HttpSource::new_boxed(&config(
            "https://example.com/api/autocomplete".to_string(),
        ))?;
        let url = source.request_url(&FetchKey::new("users/{id}", "v1.0"));
        assert_eq!(
            url.as_str(),
            "https://example.com/api/autocomplete?url=%2Fusers%2F%7Bid%7D&graphVersion=v1.0"
        );
        Ok(())
    }
}
