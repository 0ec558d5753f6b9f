#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! # Scout Settings
//!
//! Configuration is specified in several ways, with later methods overriding earlier ones.
//!
//! 1. A base configuration checked into the repository, in `config/base.yaml`.
//!    This provides the default values for most settings.
//! 2. Per-environment configuration files in the `config` directory. The
//!    environment is selected using the environment variable `SCOUT_ENV`. The
//!    settings for that environment are then loaded from `config/${env}.yaml`, if
//!    it exists. The default environment is "development".
//! 3. A local configuration file not checked into the repository, at
//!    `config/local.yaml`. This file is in `.gitignore` and is safe to use for
//!    local configuration if desired.
//! 4. Environment variables that begin with `SCOUT_` and have a separator for
//!    `__`. For example, `Settings::suggest::default_version` can be controlled
//!    from the environment variable `SCOUT_SUGGEST__DEFAULT_VERSION`.
//!
//! Tests should use `Settings::load_for_tests` which only reads from
//! `config/base.yaml`, `config/test.yaml`, and `config/local_test.yaml` (if it
//! exists). It does not read from environment variables.
//!
//! Configuration files are canonically YAML files. However, any format supported
//! by the [config] crate can be used, including JSON and TOML.

mod logging;
pub mod metadata;

pub use logging::{DirectiveWrapper, LogFormat, LoggingSettings};

use config::{Config, ConfigError, Environment, File};
use metadata::MetadataSourceConfig;
use serde::{Deserialize, Serialize};

/// Top level settings object for Scout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// The environment Scout is running in. Should only be set with the
    /// `SCOUT_ENV` environment variable.
    pub env: String,

    /// Enable additional features to debug the application, such as fixture
    /// backed metadata sources. This should not be set to true in production
    /// environments.
    pub debug: bool,

    /// Settings for the suggestion engine.
    pub suggest: SuggestSettings,

    /// The tree of metadata sources used to fetch completion metadata.
    pub metadata: MetadataSourceConfig,

    /// Settings for the Statsd sink that receives telemetry.
    #[serde(default)]
    pub metrics: MetricsSettings,

    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Settings for the suggestion engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuggestSettings {
    /// Path segments recognized as API versions, such as `v1.0` or `beta`.
    pub known_versions: Vec<String>,

    /// The API version to ask for when neither the typed URL nor the selected
    /// query carries one.
    pub default_version: String,

    /// The URL placed in the editor when a session starts.
    #[serde(default)]
    pub sample_url: String,
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self {
            known_versions: vec!["v1.0".to_string(), "beta".to_string()],
            default_version: "v1.0".to_string(),
            sample_url: String::new(),
        }
    }
}

/// Settings for the Statsd metrics sink.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// The host to send metrics to. If `None`, metrics are discarded.
    pub sink_host: Option<String>,

    /// The port to send metrics to.
    pub sink_port: u16,

    /// Prepended to the name of every metric.
    pub prefix: String,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// # Errors
    /// If any of the configured values are invalid, or if any of the required
    /// configuration files are missing.
    pub fn load() -> Result<Self, ConfigError> {
        let scout_env = std::env::var("SCOUT_ENV").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            // Start off with the base config.
            .add_source(File::with_name("./config/base"))
            .set_override("env", scout_env.as_str())?
            // Merge in an environment specific config.
            .add_source(File::with_name(&format!("config/{}", scout_env)).required(false))
            // Add a local configuration file that is `.gitignore`ed.
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables that start with "SCOUT_" and have "__"
            // to separate levels. For example, `SCOUT_LOGGING__FORMAT` maps to
            // `Settings::logging::format`.
            .add_source(
                Environment::with_prefix("SCOUT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Load settings from configuration files for tests.
    ///
    /// `changer` is applied to the loaded settings before they are returned, so
    /// that tests can adjust individual values.
    pub fn load_for_tests<F: FnOnce(&mut Self)>(changer: F) -> Self {
        let mut settings: Self = Config::builder()
            .add_source(File::with_name("../config/base"))
            .set_override("env", "test")
            .expect("Could not set env for tests")
            .add_source(File::with_name("../config/test"))
            .add_source(File::with_name("../config/local_test").required(false))
            .build()
            .expect("Could not load settings for tests")
            .try_deserialize()
            .expect("Could not convert settings");
        changer(&mut settings);
        settings
    }
}
