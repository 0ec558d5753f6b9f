#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! The request URL suggestion engine behind [Scout](../scout/index.html).
//!
//! A [`Session`] owns the text being edited. Every host event (a keystroke, a
//! blur, a finished metadata fetch) is a method on the session, and each one
//! returns the [`Command`]s the host must carry out. Fetching metadata is the
//! only asynchronous step; it goes through a [`MetadataSource`].

#[macro_use]
extern crate lazy_static;

mod domain;
pub mod filter;
pub mod resolver;
mod session;
pub mod telemetry;
pub mod tokenizer;
pub mod url;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub use crate::domain::{ParameterDefinition, ParameterSet, SampleQuery, UrlMetadata};
pub use crate::filter::SortOrder;
pub use crate::session::{
    Command, FetchRequest, FetchStatus, Key, KeyEvent, RequestToken, Session,
};
pub use crate::telemetry::{NullTelemetry, StatsdTelemetry, TelemetrySink};
pub use crate::tokenizer::{EditContext, PathSeparator};

/// Identifies one metadata document: a request path at an API version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchKey {
    /// The sanitized request path, without leading or trailing slashes, such
    /// as `me/messages`. Empty for the API root.
    pub request_url: String,

    /// The API version, such as `v1.0` or `beta`.
    pub version: String,
}

impl FetchKey {
    /// Build a key from its parts.
    pub fn new<U: Into<String>, V: Into<String>>(request_url: U, version: V) -> Self {
        Self {
            request_url: request_url.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for FetchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.version, self.request_url)
    }
}

/// A backend that can provide completion metadata for request paths.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// An operator-visible name for this source.
    fn name(&self) -> String;

    /// Fetch the metadata describing the path and version in `key`.
    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError>;

    /// Return if this source is null and can be ignored. Null sources only
    /// serve as a blank space where a source is required but none is
    /// configured.
    fn is_null(&self) -> bool {
        false
    }
}

/// A source that never knows anything.
pub struct NullSource;

#[async_trait]
impl MetadataSource for NullSource {
    fn name(&self) -> String {
        "NullSource".into()
    }

    fn is_null(&self) -> bool {
        true
    }

    async fn fetch(&self, key: FetchKey) -> Result<UrlMetadata, FetchError> {
        Ok(UrlMetadata {
            url: format!("/{}", key.request_url),
            ..UrlMetadata::default()
        })
    }
}

/// Errors that may occur while setting up a metadata source.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum SetupError {
    #[error("This metadata source cannot be used with the current Scout configuration")]
    InvalidConfiguration(#[source] anyhow::Error),

    #[error("There was a network error while setting up this metadata source")]
    Network(#[source] anyhow::Error),

    #[error("There was a local I/O error while setting up this metadata source")]
    Io(#[source] anyhow::Error),

    #[error("Required data was not in the expected format")]
    Format(#[source] anyhow::Error),
}

/// Errors that may occur while fetching metadata.
#[derive(Debug, Error)]
#[allow(missing_docs, clippy::missing_docs_in_private_items)]
pub enum FetchError {
    #[error("There was a network error while fetching metadata: {0}")]
    Network(#[source] anyhow::Error),

    #[error("Fetching metadata took longer than {0:?}")]
    Timeout(Duration),

    #[error("The metadata was not in the expected format: {0}")]
    Format(#[source] anyhow::Error),

    #[error("There was an internal error in the metadata source: {0}")]
    Internal(#[source] anyhow::Error),
}
