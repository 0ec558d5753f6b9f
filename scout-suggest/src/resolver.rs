//! Mapping an [`EditContext`] to the candidates that complete it.
//!
//! Path contexts may need a fetch. Everything else is answered from metadata
//! that is already cached, and answers with nothing if that metadata is
//! missing or does not describe the path being edited.

use crate::domain::{ParameterSet, SampleQuery, UrlMetadata};
use crate::tokenizer::{EditContext, PathSeparator};
use crate::url::{parse, sanitize};
use crate::FetchKey;
use scout_settings::SuggestSettings;
use std::sync::Arc;

/// Metadata from the last successful fetch, along with the key it was
/// fetched for.
#[derive(Debug, Clone)]
pub struct CachedMetadata {
    /// The key the metadata was requested with.
    pub key: FetchKey,
    /// The metadata itself.
    pub metadata: Arc<UrlMetadata>,
}

/// The outcome of resolving a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The complete, unfiltered candidate list.
    Candidates(Vec<String>),
    /// The cache does not cover the text; metadata for this key is needed.
    Fetch(FetchKey),
}

/// Resolves contexts against a snapshot of session state.
pub struct Resolver<'a> {
    /// Versions and defaults used to build fetch keys.
    settings: &'a SuggestSettings,
    /// The query selected in the host.
    query: &'a SampleQuery,
    /// The last fetched metadata, if any.
    cached: Option<&'a CachedMetadata>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over borrowed session state.
    pub fn new(
        settings: &'a SuggestSettings,
        query: &'a SampleQuery,
        cached: Option<&'a CachedMetadata>,
    ) -> Self {
        Self {
            settings,
            query,
            cached,
        }
    }

    /// The key metadata for `text` would be fetched with.
    ///
    /// The version named in the URL wins, then the version selected in the
    /// host, then the configured default.
    pub fn fetch_key(&self, text: &str) -> FetchKey {
        let parsed = parse(&sanitize(text), &self.settings.known_versions);
        let version = parsed
            .query_version
            .or_else(|| {
                Some(self.query.selected_version.clone()).filter(|version| !version.is_empty())
            })
            .unwrap_or_else(|| self.settings.default_version.clone());
        FetchKey::new(parsed.request_url, version)
    }

    /// Resolve `context` for the text `prefix`.
    pub fn resolve(&self, context: &EditContext, prefix: &str) -> Resolution {
        let key = self.fetch_key(prefix);
        let covered = self.cached.filter(|cached| cached.key == key);

        match (context, covered) {
            (EditContext::PathSegment(_), None) => Resolution::Fetch(key),
            (EditContext::PathSegment(separator), Some(cached)) => {
                Resolution::Candidates(self.local_lookup(&cached.metadata, *separator))
            }
            (EditContext::ParameterName, Some(cached)) => {
                Resolution::Candidates(self.parameter_names(&cached.metadata))
            }
            (EditContext::ParameterValue { parameter, .. }, Some(cached)) => {
                Resolution::Candidates(self.parameter_values(&cached.metadata, parameter))
            }
            (_, None) => {
                tracing::debug!(%key, "no cached metadata covers the parameters being edited");
                Resolution::Candidates(vec![])
            }
        }
    }

    /// Candidates for a path context, from metadata that covers the path.
    pub fn local_lookup(&self, metadata: &UrlMetadata, separator: PathSeparator) -> Vec<String> {
        match separator {
            PathSeparator::Slash => metadata.links.clone(),
            PathSeparator::QueryStart => self.parameter_names(metadata),
        }
    }

    /// The parameters available for the selected verb.
    fn parameter_names(&self, metadata: &UrlMetadata) -> Vec<String> {
        self.parameters(metadata)
            .map(ParameterSet::names)
            .unwrap_or_default()
    }

    /// The enumerated values of `parameter` for the selected verb.
    fn parameter_values(&self, metadata: &UrlMetadata, parameter: &str) -> Vec<String> {
        self.parameters(metadata)
            .map(|set| set.items_of(parameter))
            .unwrap_or_default()
    }

    /// The parameter block for the selected verb.
    fn parameters<'m>(&self, metadata: &'m UrlMetadata) -> Option<&'m ParameterSet> {
        let set = metadata.parameters_for(&self.query.selected_verb);
        if set.is_none() {
            tracing::debug!(verb = %self.query.selected_verb, "metadata lists no parameters for verb");
        }
        set
    }
}
